use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Unsupported wallet: {0}")]
    UnsupportedWallet(String),

    #[error("No wallet connected")]
    NoWalletConnected,

    #[error("Account not available: {0}")]
    AccountNotAvailable(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(feature = "native")]
impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
