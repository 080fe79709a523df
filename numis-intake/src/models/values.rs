//! Scalar value types for coin records
//!
//! `Year` and `Mintage` share a single range policy. Direct user input goes
//! through [`ValuePolicy::STRICT`], which rejects out-of-range values. Values
//! coming from AI analysis go through [`ValuePolicy::LENIENT`], which resets
//! them to the `0` ("unknown") sentinel instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lowest plausible coin year (inclusive)
pub const MIN_YEAR: i32 = -5000;
/// Highest plausible coin year (inclusive)
pub const MAX_YEAR: i32 = 3000;
/// Sentinel for an unknown year or mintage
pub const UNKNOWN: i32 = 0;

/// Range violation on a scalar coin value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("year {0} is out of plausible range [-5000, 3000]")]
    YearOutOfRange(i64),

    #[error("mintage cannot be negative: {0}")]
    NegativeMintage(i64),
}

/// What the policy does with a value outside its range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Surface the violation as a [`ValueError`]
    Reject,
    /// Replace the value with the unknown sentinel
    Default,
}

/// Range policy shared by the manual edit and ingestion paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuePolicy {
    mode: SanitizeMode,
}

impl ValuePolicy {
    pub const STRICT: ValuePolicy = ValuePolicy {
        mode: SanitizeMode::Reject,
    };
    pub const LENIENT: ValuePolicy = ValuePolicy {
        mode: SanitizeMode::Default,
    };

    pub fn mode(&self) -> SanitizeMode {
        self.mode
    }

    pub fn year(&self, value: i64) -> Result<Year, ValueError> {
        if (MIN_YEAR as i64..=MAX_YEAR as i64).contains(&value) {
            return Ok(Year(value as i32));
        }
        match self.mode {
            SanitizeMode::Reject => Err(ValueError::YearOutOfRange(value)),
            SanitizeMode::Default => {
                tracing::warn!(year = value, "Year out of plausible range, reset to unknown");
                Ok(Year::UNKNOWN)
            }
        }
    }

    pub fn mintage(&self, value: i64) -> Result<Mintage, ValueError> {
        if value >= 0 {
            return Ok(Mintage(value));
        }
        match self.mode {
            SanitizeMode::Reject => Err(ValueError::NegativeMintage(value)),
            SanitizeMode::Default => {
                tracing::warn!(mintage = value, "Negative mintage, reset to unknown");
                Ok(Mintage::UNKNOWN)
            }
        }
    }
}

/// Coin year; `0` means unknown, negative years are BC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Year(i32);

impl Year {
    pub const UNKNOWN: Year = Year(UNKNOWN);

    /// Strict constructor for direct input
    pub fn new(value: i64) -> Result<Self, ValueError> {
        ValuePolicy::STRICT.year(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_known(&self) -> bool {
        self.0 != UNKNOWN
    }
}

impl TryFrom<i64> for Year {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Year::new(value)
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> Self {
        year.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of coins minted; `0` means unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Mintage(i64);

impl Mintage {
    pub const UNKNOWN: Mintage = Mintage(0);

    /// Strict constructor for direct input
    pub fn new(value: i64) -> Result<Self, ValueError> {
        ValuePolicy::STRICT.mintage(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Mintage {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Mintage::new(value)
    }
}

impl From<Mintage> for i64 {
    fn from(mintage: Mintage) -> Self {
        mintage.0
    }
}

/// Catalog reference code (e.g. "KM# 819"); empty means unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogCode(String);

impl CatalogCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CatalogCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spanish and English conservation scales, checked in this order
const KNOWN_GRADES: &[&str] = &[
    "PROOF", "FDC", "UNC", "EBC", "MBC", "SC", "BC", "RC", "MC", "XF", "VF", "VG", "AG",
];

/// Conservation grade, free-form
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(String);

impl Grade {
    pub fn new(grade: impl Into<String>) -> Self {
        Self(grade.into())
    }

    /// Map descriptive AI output like "MBC (Muy Bien Conservada)" onto its code
    ///
    /// Input that contains no known code is kept verbatim (trimmed).
    pub fn normalized(input: &str) -> Self {
        let trimmed = input.trim();
        let upper = trimmed.to_uppercase();

        if let Some(code) = KNOWN_GRADES.iter().find(|code| upper == **code) {
            return Self::new(*code);
        }
        if upper == "F" || upper == "G" {
            return Self::new(upper);
        }

        let words: Vec<&str> = upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if let Some(code) = KNOWN_GRADES.iter().find(|code| words.contains(code)) {
            return Self::new(*code);
        }

        Self::new(trimmed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
