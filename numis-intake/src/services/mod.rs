//! Business logic for numis-intake

pub mod coin_service;
pub mod side_processor;

pub use coin_service::{AddCoinRequest, CoinService, MatchOutcome, UpdateCoinParams};
pub use side_processor::{ProcessedSide, SideProcessor, SideUpload, THUMBNAIL_WIDTH};
