//! Error types for numis-intake
//!
//! `CoinError` is what the coin service returns. Adapters work with
//! `anyhow::Error` and are wrapped at the service boundary with a context
//! message naming the failed step (e.g. "failed to bg remove front").
//! `ApiError` is the HTTP face of both.

use crate::models::ValueError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a coin service operation
#[derive(Debug, Error)]
pub enum CoinError {
    /// Direct input outside its plausible range
    #[error(transparent)]
    Validation(#[from] ValueError),

    /// An external capability (storage, background removal, image
    /// processing, AI, catalog) failed
    #[error("{context}: {source:#}")]
    Dependency {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// Malformed direct input other than a range violation
    #[error("{0}")]
    InvalidInput(String),

    /// Missing coin, image or other precondition
    #[error("{0}")]
    NotFound(String),

    /// Database write or lookup failed
    #[error("{context}: {source:#}")]
    Persistence {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CoinError {
    pub fn dependency(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        CoinError::Dependency {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn persistence(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        CoinError::Persistence {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoinError::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoinError::InvalidInput(message.into())
    }
}

/// Result type for coin service operations
pub type CoinResult<T> = Result<T, CoinError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream service failed (502)
    #[error("Upstream failure: {0}")]
    Dependency(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// numis-common error
    #[error("Common error: {0}")]
    Common(#[from] numis_common::Error),
}

impl From<CoinError> for ApiError {
    fn from(err: CoinError) -> Self {
        let message = err.to_string();
        match err {
            CoinError::Validation(_) | CoinError::InvalidInput(_) => ApiError::BadRequest(message),
            CoinError::NotFound(_) => ApiError::NotFound(message),
            CoinError::Dependency { .. } => ApiError::Dependency(message),
            CoinError::Persistence { .. } => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Dependency(msg) => (StatusCode::BAD_GATEWAY, "DEPENDENCY_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
