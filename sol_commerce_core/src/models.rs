use crate::provider::WalletProvider;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Typed capability probe of a provider's named feature bag.
///
/// Probed once per provider at the discovery boundary; the untyped feature
/// map never crosses into the connector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSet {
    pub connect: bool,
    pub disconnect: bool,
    pub events: bool,
    pub sign: bool,
}

impl FeatureSet {
    /// Create a probe result with every recognized feature present.
    pub fn full() -> Self {
        Self {
            connect: true,
            disconnect: true,
            events: true,
            sign: true,
        }
    }

    /// A wallet is connectable iff it can both connect and disconnect.
    pub fn connectable(&self) -> bool {
        self.connect && self.disconnect
    }
}

/// Opaque provider-specific account handle, retained for downstream signing.
/// The WASM boundary stores the original JS account object in here.
#[derive(Clone)]
pub struct AccountHandle(Rc<dyn Any>);

impl AccountHandle {
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Handle with no backing provider object.
    pub fn empty() -> Self {
        Self(Rc::new(()))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Default for AccountHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountHandle(..)")
    }
}

/// An address exposed by a connected wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletAccount {
    pub address: String,
    pub icon: Option<String>,
    #[serde(skip_serializing)]
    pub raw: AccountHandle,
}

impl WalletAccount {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            icon: None,
            raw: AccountHandle::empty(),
        }
    }
}

/// One discovered wallet. `name` is the de-duplication key.
#[derive(Clone, Serialize)]
pub struct WalletEntry {
    #[serde(skip_serializing)]
    pub provider: Rc<dyn WalletProvider>,
    pub name: String,
    pub icon: Option<String>,
    pub chains: Vec<String>,
    pub installed: bool,
    pub connectable: bool,
    pub features: FeatureSet,
}

impl WalletEntry {
    /// Build an entry from a discovered provider, probing its features once.
    ///
    /// When `required_chain` is set and the provider does not advertise it,
    /// the entry is kept but marked not installed so UIs can filter it.
    pub fn from_provider(provider: Rc<dyn WalletProvider>, required_chain: Option<&str>) -> Self {
        let features = provider.features();
        let chains = provider.chains().to_vec();
        let installed = match required_chain {
            Some(chain) => chains.iter().any(|c| c == chain),
            None => true,
        };
        Self {
            name: provider.name().to_string(),
            icon: provider.icon().map(|i| i.to_string()),
            chains,
            installed,
            connectable: features.connectable(),
            features,
            provider,
        }
    }
}

impl fmt::Debug for WalletEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletEntry")
            .field("name", &self.name)
            .field("installed", &self.installed)
            .field("connectable", &self.connectable)
            .field("features", &self.features)
            .finish()
    }
}

/// The single mutable snapshot published to subscribers.
#[derive(Clone, Default, Serialize)]
pub struct ConnectorState {
    pub wallets: Vec<WalletEntry>,
    #[serde(serialize_with = "serialize_wallet_name")]
    pub selected_wallet: Option<Rc<dyn WalletProvider>>,
    pub connected: bool,
    pub connecting: bool,
    pub accounts: Vec<WalletAccount>,
    pub selected_account: Option<String>,
}

impl ConnectorState {
    pub fn selected_wallet_name(&self) -> Option<&str> {
        self.selected_wallet.as_deref().map(|p| p.name())
    }

    pub fn wallet(&self, name: &str) -> Option<&WalletEntry> {
        self.wallets.iter().find(|w| w.name == name)
    }
}

impl fmt::Debug for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorState")
            .field("wallets", &self.wallets)
            .field("selected_wallet", &self.selected_wallet_name())
            .field("connected", &self.connected)
            .field("connecting", &self.connecting)
            .field("accounts", &self.accounts)
            .field("selected_account", &self.selected_account)
            .finish()
    }
}

/// Snapshots carry the selected wallet as its name; the live provider handle
/// never crosses a serialization boundary.
fn serialize_wallet_name<S: Serializer>(
    wallet: &Option<Rc<dyn WalletProvider>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match wallet {
        Some(provider) => serializer.serialize_some(provider.name()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectable_requires_both_connect_and_disconnect() {
        let combos = [
            (false, false, false),
            (true, false, false),
            (false, true, false),
            (true, true, true),
        ];
        for (connect, disconnect, expected) in combos {
            let features = FeatureSet {
                connect,
                disconnect,
                ..FeatureSet::default()
            };
            assert_eq!(features.connectable(), expected);
        }
    }

    #[test]
    fn account_serialization_skips_raw_handle() {
        let account = WalletAccount {
            address: "Addr1".to_string(),
            icon: Some("data:image/svg+xml;base64,...".to_string()),
            raw: AccountHandle::new(42u32),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["address"], "Addr1");
        assert!(json.get("raw").is_none());
    }

    #[test]
    fn account_handle_downcasts_to_original_type() {
        let handle = AccountHandle::new("opaque".to_string());
        assert_eq!(handle.downcast_ref::<String>().map(|s| s.as_str()), Some("opaque"));
        assert!(handle.downcast_ref::<u32>().is_none());
    }
}
