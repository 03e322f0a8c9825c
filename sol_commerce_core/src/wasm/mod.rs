// WASM-specific implementations
pub mod poll_source;
pub mod provider;
pub mod registry;
pub mod storage_impl;

// Re-exports
pub use poll_source::*;
pub use provider::*;
pub use registry::*;
pub use storage_impl::*;

use crate::account_source::AccountChangeSource;
use crate::config::ConnectorConfig;
use crate::connector::ConnectorEnv;
use crate::error::CoreError;
use crate::provider::WalletRegistry;
use std::rc::Rc;

/// Assemble the browser environment: window handshake discovery,
/// localStorage persistence and the gloo-timers poll strategy.
pub fn browser_env(config: &ConnectorConfig) -> Result<ConnectorEnv, CoreError> {
    let registry = WindowRegistry::new()?;
    Ok(ConnectorEnv {
        registry: Some(Rc::new(registry) as Rc<dyn WalletRegistry>),
        storage: Rc::new(LocalStorageStore::new(config.storage_prefix.clone())),
        poll_source: Some(
            Rc::new(GlooPollSource::new(config.poll_interval_ms as u32))
                as Rc<dyn AccountChangeSource>,
        ),
    })
}
