// Wallet provider abstractions - allow both browser-injected and mock implementations

use crate::error::CoreError;
use crate::models::{FeatureSet, WalletAccount};
use async_trait::async_trait;
use std::rc::Rc;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, CoreError>;

/// Releases a registry or provider event subscription. Calling it more than
/// once is the caller's bug; holders call it exactly once.
pub type Unsubscriber = Box<dyn FnOnce()>;

/// Callback fired when the registry's provider set changes.
pub type RegistryListener = Box<dyn Fn()>;

/// Callback fired with the full updated account list of a provider.
pub type AccountsListener = Box<dyn Fn(Vec<WalletAccount>)>;

/// One installed wallet, as announced by the environment.
///
/// Implementations exist for:
/// - WASM: wallets announced through the browser registration handshake
/// - Tests: in-memory mocks with scripted behavior
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Display name, unique per environment by convention.
    fn name(&self) -> &str;

    /// Data-URI icon, if the wallet ships one.
    fn icon(&self) -> Option<&str>;

    /// Chain identifiers the wallet advertises support for.
    fn chains(&self) -> &[String];

    /// Feature probe taken once when the provider was wrapped.
    fn features(&self) -> FeatureSet;

    /// Accounts the wallet currently exposes without a fresh connect.
    /// Read by the timed-poll change strategy.
    fn accounts(&self) -> Vec<WalletAccount>;

    /// Invoke the connect feature; resolves to the exposed accounts.
    async fn connect(&self) -> ProviderResult<Vec<WalletAccount>>;

    /// Invoke the disconnect feature.
    async fn disconnect(&self) -> ProviderResult<()>;

    /// Subscribe to the events feature's "change" notifications.
    /// Returns `None` when the wallet has no events feature.
    fn subscribe_change(&self, listener: AccountsListener) -> Option<Unsubscriber>;
}

/// The environment's wallet registry: the current provider set plus
/// registration lifecycle events.
pub trait WalletRegistry {
    /// Providers currently announced, in announcement order. De-duplication
    /// is the consumer's concern.
    fn providers(&self) -> ProviderResult<Vec<Rc<dyn WalletProvider>>>;

    /// Notify on every new provider registration.
    fn on_register(&self, listener: RegistryListener) -> Unsubscriber;

    /// Notify whenever a provider withdraws itself.
    fn on_unregister(&self, listener: RegistryListener) -> Unsubscriber;
}
