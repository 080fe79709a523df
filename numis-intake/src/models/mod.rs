//! Domain models for the coin intake service

pub mod analysis;
pub mod catalog;
pub mod coin;
pub mod values;

pub use analysis::{CoinAnalysisResult, ANALYSIS_FAILED_MARKER};
pub use catalog::{CatalogCandidate, CatalogDetail, Issuer, TypeSearchResponse};
pub use coin::{Coin, CoinFilter, CoinImage, Group, ImageType, Side};
pub use values::{CatalogCode, Grade, Mintage, SanitizeMode, ValueError, ValuePolicy, Year};
