// Sol Commerce Core Library
// Platform-agnostic wallet connector logic

pub mod account_source;
pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod provider;
pub mod storage;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

// Re-exports
pub use account_source::*;
pub use config::ConnectorConfig;
pub use connector::*;
pub use error::CoreError;
pub use models::*;
pub use provider::*;
pub use storage::*;
