//! AI analysis output
//!
//! The model is asked for a JSON object but routinely returns numbers as
//! strings, `null` for unknowns or floats where integers were requested. The
//! deserializers below accept all of those and fall back to zero values rather
//! than failing the whole decode.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Structured fields extracted from a pair of coin photographs
///
/// Year and mintage are kept as raw integers here. Range policy is applied
/// by the caller when the result is merged into a coin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinAnalysisResult {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub year: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub face_value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(deserialize_with = "lenient_string")]
    pub material: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub km_code: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub min_value: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_value: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub grade: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub weight_g: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub diameter_mm: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub thickness_mm: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub edge: String,
    #[serde(deserialize_with = "lenient_string")]
    pub shape: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mint: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub mintage: i64,

    /// Entire decoded response, kept verbatim
    #[serde(skip)]
    pub raw_details: Map<String, Value>,
}

impl CoinAnalysisResult {
    /// Decode a model response object, keeping the object itself as `raw_details`
    pub fn from_json_object(object: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut result: CoinAnalysisResult =
            serde_json::from_value(Value::Object(object.clone()))?;
        result.raw_details = object;
        Ok(result)
    }

    /// Placeholder stored when analysis fails during intake
    pub fn failed(detail: &str) -> Self {
        let mut raw_details = Map::new();
        raw_details.insert("error".to_string(), Value::String(detail.to_string()));
        Self {
            description: format!("{}: {}", ANALYSIS_FAILED_MARKER, detail),
            raw_details,
            ..Default::default()
        }
    }
}

/// Prefix of the description written when analysis fails during intake
pub const ANALYSIS_FAILED_MARKER: &str = "Analysis failed";

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| !matches!(c, '.' | ',' | ' ' | '_')).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    })
}
