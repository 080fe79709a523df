//! Production adapters for the capability traits in `crate::types`

pub mod gemini;
pub mod image_processor;
pub mod numista;
pub mod prompt;
pub mod rembg;
pub mod storage;

pub use gemini::GeminiClient;
pub use image_processor::LocalImageProcessor;
pub use numista::NumistaClient;
pub use rembg::RembgClient;
pub use storage::LocalStorage;
