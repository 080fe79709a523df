//! # Numis Common Library
//!
//! Shared code for the numis services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database initialization (schema creation)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
