//! Errors raised by shared configuration and storage code

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database directory could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable TOML file or unparseable stored setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Update addressed a row that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON payload column could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
