use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Connector configuration. Every field has a default so hosts can construct
/// the client with no configuration at all.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectorConfig {
    /// Reconnect the last persisted wallet shortly after construction.
    #[serde(default)]
    pub autoconnect: bool,
    /// Verbose state-transition logging. Observability only; never changes
    /// behavior.
    #[serde(default)]
    pub debug: bool,
    /// Interval for the timed-poll account-change strategy. Only read when a
    /// poll source is installed and the connected wallet lacks an events
    /// feature.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Key prefix applied by namespacing storage backends.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    /// When set, wallets not advertising this chain identifier are marked
    /// not installed. Entries are never removed by this filter.
    #[serde(default)]
    pub chain: Option<String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            autoconnect: false,
            debug: false,
            poll_interval_ms: default_poll_interval_ms(),
            storage_prefix: default_storage_prefix(),
            chain: None,
        }
    }
}

impl ConnectorConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: ConnectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        let config: ConnectorConfig = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Validation("poll_interval_ms must be > 0".to_string()));
        }
        if let Some(chain) = &self.chain {
            if chain.is_empty() {
                return Err(CoreError::Validation("chain must be non-empty when set".to_string()));
            }
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 { 1000 }
fn default_storage_prefix() -> String { "sol_commerce_".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConnectorConfig::from_json("{}").unwrap();
        assert!(!config.autoconnect);
        assert!(!config.debug);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.storage_prefix, "sol_commerce_");
        assert_eq!(config.chain, None);
    }

    #[test]
    fn partial_document_keeps_remaining_defaults() {
        let config =
            ConnectorConfig::from_json(r#"{"autoconnect": true, "chain": "solana:mainnet"}"#)
                .unwrap();
        assert!(config.autoconnect);
        assert_eq!(config.chain.as_deref(), Some("solana:mainnet"));
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ConnectorConfig::from_json(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let err = ConnectorConfig::from_json(r#"{"chain": ""}"#).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
