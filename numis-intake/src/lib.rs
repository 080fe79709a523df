//! numis-intake library interface
//!
//! Exposes the coin service, its adapters and the HTTP router for
//! integration testing.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult, CoinError, CoinResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::CoinService;
use tower_http::trace::TraceLayer;
use types::AnalysisOptions;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: CoinService,
    /// Model, temperature and language used when a request leaves them out
    pub analysis_defaults: AnalysisOptions,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: CoinService, analysis_defaults: AnalysisOptions) -> Self {
        Self {
            service,
            analysis_defaults,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::coin_routes())
        .merge(api::group_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
