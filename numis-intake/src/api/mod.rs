//! HTTP API handlers for numis-intake
//!
//! Handlers only parse input and delegate to `CoinService`.

pub mod coins;
pub mod groups;
pub mod health;

pub use coins::coin_routes;
pub use groups::group_routes;
pub use health::health_routes;
