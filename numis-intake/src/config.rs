//! Configuration resolution for numis-intake
//!
//! Service credentials and endpoints resolve with Database → ENV → TOML
//! priority. A value present in more than one source is logged as a likely
//! misconfiguration; the highest-priority source still wins.

use crate::db::settings;
use numis_common::config::TomlConfig;
use numis_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

pub const NUMISTA_API_KEY_ENV: &str = "NUMIS_NUMISTA_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "NUMIS_GEMINI_API_KEY";
pub const REMBG_URL_ENV: &str = "NUMIS_REMBG_URL";

/// Background removal endpoint used when nothing is configured
pub const DEFAULT_REMBG_URL: &str = "http://rembg:5000/api/remove";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// `None` disables catalog enrichment
    pub numista_api_key: Option<String>,
    /// `None` makes every analysis call fail
    pub gemini_api_key: Option<String>,
    /// Empty selects the analyzer's default model
    pub gemini_model: String,
    pub rembg_url: String,
}

impl ServiceConfig {
    pub async fn resolve(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<Self> {
        let numista_api_key = resolve_value(
            db,
            "Numista API key",
            settings::NUMISTA_API_KEY,
            Some(NUMISTA_API_KEY_ENV),
            toml_config.numista_api_key.as_deref(),
        )
        .await?;
        if numista_api_key.is_none() {
            warn!("Numista API key not configured, catalog enrichment disabled");
        }

        let gemini_api_key = resolve_value(
            db,
            "Gemini API key",
            settings::GEMINI_API_KEY,
            Some(GEMINI_API_KEY_ENV),
            toml_config.gemini_api_key.as_deref(),
        )
        .await?;
        if gemini_api_key.is_none() {
            warn!("Gemini API key not configured, coin analysis will fail");
        }

        let gemini_model = resolve_value(
            db,
            "Gemini model",
            settings::GEMINI_MODEL,
            None,
            toml_config.gemini_model.as_deref(),
        )
        .await?
        .unwrap_or_default();

        let rembg_url = resolve_value(
            db,
            "rembg URL",
            settings::REMBG_URL,
            Some(REMBG_URL_ENV),
            toml_config.rembg_url.as_deref(),
        )
        .await?
        .unwrap_or_else(|| DEFAULT_REMBG_URL.to_string());

        Ok(Self {
            numista_api_key,
            gemini_api_key,
            gemini_model,
            rembg_url,
        })
    }
}

/// Resolve one value from the database, the environment and the TOML file
pub async fn resolve_value(
    db: &Pool<Sqlite>,
    label: &str,
    setting_key: &str,
    env_var: Option<&str>,
    toml_value: Option<&str>,
) -> Result<Option<String>> {
    let db_value = settings::get_setting::<String>(db, setting_key)
        .await?
        .filter(|v| is_valid_value(v));
    let env_value = env_var
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v)).map(str::to_string);

    let sources: Vec<&str> = [
        db_value.as_ref().map(|_| "database"),
        env_value.as_ref().map(|_| "environment"),
        toml_value.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("{} loaded from {}", label, source);
    }

    Ok(db_value.or(env_value).or(toml_value))
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}
