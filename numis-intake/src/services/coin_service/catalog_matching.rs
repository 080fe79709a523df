//! Catalog matching against Numista
//!
//! A coin is matched by searching the catalog with its face value, currency
//! and country, then walking the candidates in search order. The first
//! candidate whose issue span covers the coin's year and whose detail
//! reports the same numeric face value wins. Matching never scores beyond
//! that equality.

use super::CoinService;
use crate::error::{CoinError, CoinResult};
use crate::models::{CatalogCode, CatalogDetail, Coin};
use crate::types::CatalogQuery;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Above this many search results the match is too ambiguous to attempt
pub const AMBIGUOUS_RESULT_THRESHOLD: i64 = 50;

/// Page size requested from the catalog search
pub const SEARCH_RESULT_LIMIT: u32 = 50;

/// Maximum difference for two face values to count as equal
pub const FACE_VALUE_TOLERANCE: f64 = 0.001;

const SEARCH_CATEGORY: &str = "coin";

/// Minor-unit words; a face value containing one as a whole word is divided by 100
const MINOR_UNIT_WORDS: &[&str] = &[
    "cent", "cents", "centavo", "centavos", "centime", "centimes", "centimo", "centimos",
    "céntimo", "céntimos", "centesimo", "centesimi", "centésimo", "centésimos", "penny",
    "pennies", "pence",
];

/// How an automatic enrichment run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The search returned nothing
    NoResults,
    /// The search returned more than [`AMBIGUOUS_RESULT_THRESHOLD`] results
    TooManyResults(i64),
    /// Candidate with this catalog id was accepted
    Matched(i64),
    /// Candidates were evaluated but none matched
    NoMatch,
}

impl MatchOutcome {
    pub fn catalog_id(&self) -> i64 {
        match self {
            MatchOutcome::Matched(id) => *id,
            _ => 0,
        }
    }
}

/// Numeric face value in major currency units
///
/// Reads the first number in `text` (decimal comma accepted, repeated dots
/// read as thousands separators). Minor-unit text such as "20 Euro Cent"
/// yields 0.2. Text without any number yields 0.
pub fn parse_face_value(text: &str) -> f64 {
    let lower = text.to_lowercase();

    let token: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if token.is_empty() {
        return 0.0;
    }

    let mut normalized = if token.contains(',') {
        token.replace('.', "").replace(',', ".")
    } else {
        token
    };
    if normalized.matches('.').count() > 1 {
        normalized = normalized.replace('.', "");
    }

    let value: f64 = match normalized.trim_end_matches('.').parse() {
        Ok(value) => value,
        Err(_) => return 0.0,
    };

    let minor_unit = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| MINOR_UNIT_WORDS.contains(&word));
    if minor_unit {
        value / 100.0
    } else {
        value
    }
}

fn face_values_match(candidate: f64, target: f64) -> bool {
    candidate > 0.0 && target > 0.0 && (candidate - target).abs() <= FACE_VALUE_TOLERANCE
}

/// `value.numeric_value` of a type detail
fn detail_face_value(detail: &CatalogDetail) -> f64 {
    detail
        .get("value")
        .and_then(|v| v.get("numeric_value"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn search_terms(coin: &Coin) -> String {
    [coin.face_value.as_str(), coin.currency.as_str(), coin.country.as_str()]
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_name(detail: &CatalogDetail, key: &str) -> Option<String> {
    detail
        .get(key)?
        .as_array()?
        .first()?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn string_field(detail: &CatalogDetail, key: &str) -> Option<String> {
    detail.get(key)?.as_str().map(str::to_string)
}

fn number_field(detail: &CatalogDetail, key: &str) -> Option<f64> {
    detail.get(key)?.as_f64()
}

/// `"<CODE># <number>"` from the first catalogue reference
fn first_reference(detail: &CatalogDetail) -> Option<String> {
    let reference = detail.get("references")?.as_array()?.first()?;
    let code = reference.get("catalogue")?.get("code")?.as_str()?;
    let number = match reference.get("number")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("{}# {}", code, number))
}

/// Overlay catalog detail fields onto a coin
///
/// Fields absent from the detail (or of an unexpected JSON type) leave the
/// coin's current value in place.
pub fn map_catalog_details(coin: &mut Coin, detail: &CatalogDetail) {
    if let Some(v) = number_field(detail, "size") {
        coin.diameter_mm = v;
    }
    if let Some(v) = number_field(detail, "thickness") {
        coin.thickness_mm = v;
    }
    if let Some(v) = number_field(detail, "weight") {
        coin.weight_g = v;
    }
    if let Some(v) = string_field(detail, "shape") {
        coin.shape = v;
    }
    if let Some(text) = detail
        .get("composition")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
    {
        coin.material = text.to_string();
    }
    if let Some(mint) = first_name(detail, "mints") {
        coin.mint = mint;
    }
    if let Some(code) = first_reference(detail) {
        coin.km_code = CatalogCode::new(code);
    }
    if let Some(ruler) = first_name(detail, "ruler") {
        coin.ruler = ruler;
    }
    if let Some(v) = string_field(detail, "orientation") {
        coin.orientation = v;
    }
    if let Some(v) = string_field(detail, "series") {
        coin.series = v;
    }
    if let Some(v) = string_field(detail, "commemorated_topic") {
        coin.commemorated_topic = v;
    }

    debug!(
        coin_id = %coin.id,
        diameter = coin.diameter_mm,
        weight = coin.weight_g,
        mint = %coin.mint,
        km = %coin.km_code,
        "Mapped catalog details"
    );
}

impl CoinService {
    /// Search the catalog for the coin and record the outcome
    ///
    /// The coin is written back whatever the outcome, so "no match" is
    /// distinguishable from "never attempted". A failing search aborts;
    /// a failing candidate detail is skipped.
    pub async fn enrich_coin_with_numista(&self, coin_id: Uuid) -> CoinResult<MatchOutcome> {
        let catalog = self.catalog_client()?.clone();
        let mut coin = self.load_coin(coin_id).await?;

        let query = CatalogQuery {
            q: search_terms(&coin),
            category: SEARCH_CATEGORY.to_string(),
            year: Some(coin.year.value()).filter(|y| *y > 0),
            count: SEARCH_RESULT_LIMIT,
        };
        info!(coin_id = %coin_id, q = %query.q, year = ?query.year, "Searching catalog");

        let results = catalog
            .search_types(&query)
            .await
            .map_err(|e| CoinError::dependency("numista search failed", e))?;
        info!(coin_id = %coin_id, count = results.count, returned = results.types.len(), "Catalog search completed");

        coin.numista_search = Some(json!({
            "q": query.q,
            "count": results.count,
            "types": results.types,
        }));

        let target = parse_face_value(&coin.face_value);
        let year = coin.year.value();

        let outcome = if results.count == 0 || results.types.is_empty() {
            MatchOutcome::NoResults
        } else if results.count > AMBIGUOUS_RESULT_THRESHOLD {
            MatchOutcome::TooManyResults(results.count)
        } else {
            let mut outcome = MatchOutcome::NoMatch;
            for candidate in results.types.iter().filter(|c| c.covers_year(year)) {
                let detail = match catalog.get_type(candidate.id).await {
                    Ok(detail) => detail,
                    Err(e) => {
                        warn!(coin_id = %coin_id, numista_id = candidate.id, error = %e, "Candidate detail unavailable, skipping");
                        continue;
                    }
                };

                let value = detail_face_value(&detail);
                debug!(numista_id = candidate.id, value, target, "Comparing face values");
                if face_values_match(value, target) {
                    map_catalog_details(&mut coin, &detail);
                    coin.numista_details = Some(detail);
                    outcome = MatchOutcome::Matched(candidate.id);
                    break;
                }
            }
            outcome
        };

        coin.numista_number = outcome.catalog_id();
        match outcome {
            MatchOutcome::Matched(id) => info!(coin_id = %coin_id, numista_id = id, "Catalog match found"),
            other => info!(coin_id = %coin_id, outcome = ?other, "No catalog match"),
        }

        self.store_update(&mut coin, "failed to update coin with numista result")
            .await?;
        Ok(outcome)
    }

    /// Apply a catalog entry chosen by the user
    pub async fn apply_numista_candidate(&self, coin_id: Uuid, numista_id: i64) -> CoinResult<Coin> {
        let catalog = self.catalog_client()?.clone();
        let mut coin = self.load_coin(coin_id).await?;

        let detail = catalog
            .get_type(numista_id)
            .await
            .map_err(|e| CoinError::dependency("failed to get numista details", e))?;

        map_catalog_details(&mut coin, &detail);
        coin.numista_details = Some(detail);
        coin.numista_number = numista_id;

        self.store_update(&mut coin, "failed to update coin").await?;
        info!(coin_id = %coin_id, numista_id, "Applied catalog candidate");
        Ok(coin)
    }
}
