//! Database access for numis-intake
//!
//! Schema creation lives in `numis_common::db`; this module holds the
//! service's queries and the SQLite-backed repositories.

pub mod coins;
pub mod groups;
pub mod settings;

pub use coins::SqliteCoinRepository;
pub use groups::SqliteGroupRepository;
