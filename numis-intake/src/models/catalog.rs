//! Catalog search payloads
//!
//! Search results are typed; type details stay an opaque JSON map because
//! only a handful of their fields are ever read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full detail payload of one catalog type
pub type CatalogDetail = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issuer {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// One search hit, not yet confirmed as the coin's match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub min_year: Option<i32>,
    #[serde(default)]
    pub max_year: Option<i32>,
    #[serde(default)]
    pub issuer: Option<Issuer>,
}

impl CatalogCandidate {
    /// Whether the candidate's issue span contains `year`
    ///
    /// An unknown coin year (0) matches every candidate. A missing bound on
    /// the candidate is open-ended.
    pub fn covers_year(&self, year: i32) -> bool {
        if year == 0 {
            return true;
        }
        self.min_year.map_or(true, |min| year >= min) && self.max_year.map_or(true, |max| year <= max)
    }
}

/// Response of a type search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSearchResponse {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub types: Vec<CatalogCandidate>,
}
