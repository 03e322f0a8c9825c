// Wallet connector state machine
// Discovery, connect/select/disconnect lifecycle, persistence and pub/sub

use crate::account_source::{AccountChangeSource, ProviderEventSource, WatchGuard};
use crate::config::ConnectorConfig;
use crate::error::CoreError;
use crate::models::{ConnectorState, FeatureSet, WalletAccount, WalletEntry};
use crate::provider::{
    AccountsListener, RegistryListener, Unsubscriber, WalletProvider, WalletRegistry,
};
use crate::storage::{keys, KeyValueStore, NoopStore};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Capabilities handed to the client at construction.
///
/// Explicit dependency injection: the owning application assembles one
/// environment, constructs one client, and passes the client down. There is
/// no global instance.
pub struct ConnectorEnv {
    pub registry: Option<Rc<dyn WalletRegistry>>,
    pub storage: Rc<dyn KeyValueStore>,
    /// Timed-poll change strategy for wallets without an events feature.
    /// When absent, the connector performs no polling of its own.
    pub poll_source: Option<Rc<dyn AccountChangeSource>>,
}

impl ConnectorEnv {
    /// Environment without a browser context (e.g. server-side rendering):
    /// discovery is skipped and storage is a no-op. The client starts empty
    /// and disconnected without erroring.
    pub fn headless() -> Self {
        Self {
            registry: None,
            storage: Rc::new(NoopStore),
            poll_source: None,
        }
    }
}

impl Default for ConnectorEnv {
    fn default() -> Self {
        Self::headless()
    }
}

/// Listener registration handle returned by [`WalletConnectorClient::subscribe`].
///
/// `unsubscribe` removes exactly one registration and is idempotent. Dropping
/// the handle without calling it leaves the listener registered.
pub struct Subscription {
    inner: Weak<RefCell<Inner>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

struct Inner {
    state: ConnectorState,
    listeners: Vec<(u64, Rc<dyn Fn(&ConnectorState)>)>,
    next_listener_id: u64,
    // Generation counter: select, disconnect and destroy each start a new
    // generation; an awaited result is committed only if its generation is
    // still current.
    attempt: u64,
    registry_subs: Vec<Unsubscriber>,
    watch: Option<WatchGuard>,
    debug: bool,
}

impl Inner {
    fn new(debug: bool) -> Self {
        Self {
            state: ConnectorState::default(),
            listeners: Vec::new(),
            next_listener_id: 0,
            attempt: 0,
            registry_subs: Vec::new(),
            watch: None,
            debug,
        }
    }

    /// Replace the account list, keeping the previous selection when its
    /// address survives, else falling back to the first account. An empty
    /// list drops `connected` but leaves the session in place; the connector
    /// never runs the disconnect routine implicitly.
    fn apply_accounts_update(&mut self, accounts: Vec<WalletAccount>) {
        if self.state.selected_wallet.is_none() {
            return;
        }
        let kept = self
            .state
            .selected_account
            .as_ref()
            .filter(|address| accounts.iter().any(|a| &a.address == *address))
            .cloned();
        self.state.selected_account =
            kept.or_else(|| accounts.first().map(|a| a.address.clone()));
        self.state.connected = !accounts.is_empty();
        self.state.accounts = accounts;
        if self.debug {
            debug!(
                "accounts changed: {} exposed, selected {:?}",
                self.state.accounts.len(),
                self.state.selected_account
            );
        }
    }
}

fn notify_inner(inner: &Rc<RefCell<Inner>>) {
    // Listeners run after the borrow is released so they may re-enter the
    // client (snapshot, subscribe, unsubscribe) safely.
    let (snapshot, listeners) = {
        let inner = inner.borrow();
        let listeners: Vec<Rc<dyn Fn(&ConnectorState)>> =
            inner.listeners.iter().map(|(_, l)| l.clone()).collect();
        (inner.state.clone(), listeners)
    };
    for listener in &listeners {
        listener(&snapshot);
    }
}

/// Discovers wallet providers, drives the connect/select/disconnect
/// lifecycle, persists the last-used wallet name and publishes state
/// snapshots to subscribers.
pub struct WalletConnectorClient {
    config: ConnectorConfig,
    registry: Option<Rc<dyn WalletRegistry>>,
    storage: Rc<dyn KeyValueStore>,
    poll_source: Option<Rc<dyn AccountChangeSource>>,
    event_source: ProviderEventSource,
    inner: Rc<RefCell<Inner>>,
}

impl WalletConnectorClient {
    /// Build a client and run initial discovery.
    ///
    /// Discovery failures never propagate out of construction; they leave the
    /// wallet list empty and are logged only when `config.debug` is set.
    pub fn new(config: ConnectorConfig, env: ConnectorEnv) -> Rc<Self> {
        let debug = config.debug;
        let client = Rc::new(Self {
            config,
            registry: env.registry,
            storage: env.storage,
            poll_source: env.poll_source,
            event_source: ProviderEventSource,
            inner: Rc::new(RefCell::new(Inner::new(debug))),
        });

        if let Some(registry) = &client.registry {
            client.refresh_wallets();

            let weak = Rc::downgrade(&client);
            let refresh = weak.clone();
            let on_register: RegistryListener = Box::new(move || {
                if let Some(client) = refresh.upgrade() {
                    client.refresh_wallets();
                }
            });
            let on_unregister: RegistryListener = Box::new(move || {
                if let Some(client) = weak.upgrade() {
                    client.refresh_wallets();
                }
            });
            let register_sub = registry.on_register(on_register);
            let unregister_sub = registry.on_unregister(on_unregister);
            let mut inner = client.inner.borrow_mut();
            inner.registry_subs.push(register_sub);
            inner.registry_subs.push(unregister_sub);
        }

        client
    }

    /// Connect the wallet named `name`.
    ///
    /// A concurrent call while another connect is in flight is permitted; the
    /// most recently started attempt owns the final state and stale results
    /// are discarded.
    pub async fn select(&self, name: &str) -> Result<(), CoreError> {
        let (provider, features) = {
            let inner = self.inner.borrow();
            let entry = match inner.state.wallet(name) {
                Some(entry) => entry,
                None => return Err(CoreError::WalletNotFound(name.to_string())),
            };
            if !entry.features.connect {
                return Err(CoreError::UnsupportedWallet(name.to_string()));
            }
            (entry.provider.clone(), entry.features)
        };

        let attempt = self.begin_attempt();
        self.debug_log(&format!("connecting to \"{}\"", name));
        self.notify();

        match provider.connect().await {
            Ok(accounts) => {
                if !self.attempt_is_current(attempt) {
                    self.debug_log(&format!(
                        "connect to \"{}\" superseded; result discarded",
                        name
                    ));
                    return Ok(());
                }
                if accounts.is_empty() {
                    let message = format!("wallet \"{}\" connected with no accounts", name);
                    self.reset_session();
                    self.warn_log(&message);
                    self.notify();
                    return Err(CoreError::Provider(message));
                }
                self.commit_connected(provider.clone(), accounts);
                self.persist_wallet_name(name).await;
                if !self.attempt_is_current(attempt) {
                    // A newer attempt began while persisting; it owns the
                    // change watch and the notifications from here on.
                    return Ok(());
                }
                self.attach_watch(provider, features);
                self.debug_log(&format!("connected to \"{}\"", name));
                self.notify();
                Ok(())
            }
            Err(err) => {
                if self.attempt_is_current(attempt) {
                    self.reset_session();
                    self.warn_log(&format!("connect to \"{}\" failed: {}", name, err));
                    self.notify();
                } else {
                    self.debug_log(&format!(
                        "superseded connect to \"{}\" failed: {}",
                        name, err
                    ));
                }
                Err(err)
            }
        }
    }

    /// Select one of the connected wallet's accounts by address.
    ///
    /// An address the wallet has not exposed yet triggers one refresh connect
    /// against the already-selected provider; some wallets only reveal
    /// additional accounts on re-connect.
    pub async fn select_account(&self, address: &str) -> Result<(), CoreError> {
        let (provider, attempt, present) = {
            let inner = self.inner.borrow();
            let provider = match inner.state.selected_wallet.clone() {
                Some(provider) => provider,
                None => return Err(CoreError::NoWalletConnected),
            };
            let present = inner.state.accounts.iter().any(|a| a.address == address);
            (provider, inner.attempt, present)
        };

        if present {
            {
                let mut inner = self.inner.borrow_mut();
                inner.state.selected_account = Some(address.to_string());
            }
            self.debug_log(&format!("selected account {}", address));
            self.notify();
            return Ok(());
        }

        self.debug_log(&format!(
            "account {} not exposed; refreshing via reconnect",
            address
        ));
        let refreshed = provider.connect().await?;

        if !self.attempt_is_current(attempt) {
            self.debug_log("session changed during account refresh; result discarded");
            return Err(CoreError::AccountNotAvailable(address.to_string()));
        }

        let selected = {
            let mut inner = self.inner.borrow_mut();
            inner.apply_accounts_update(refreshed);
            if inner.state.accounts.iter().any(|a| a.address == address) {
                inner.state.selected_account = Some(address.to_string());
                true
            } else {
                false
            }
        };
        self.notify();

        if selected {
            Ok(())
        } else {
            Err(CoreError::AccountNotAvailable(address.to_string()))
        }
    }

    /// Disconnect the current wallet. Always succeeds locally: a rejection
    /// from the provider's disconnect feature is logged and swallowed.
    pub async fn disconnect(&self) {
        let (provider, attempt, watch) = {
            let mut inner = self.inner.borrow_mut();
            inner.attempt += 1;
            (
                inner.state.selected_wallet.clone(),
                inner.attempt,
                inner.watch.take(),
            )
        };
        drop(watch);

        if let Some(provider) = &provider {
            if provider.features().disconnect {
                if let Err(err) = provider.disconnect().await {
                    self.warn_log(&format!("provider disconnect failed: {}", err));
                }
            }
        }

        if !self.attempt_is_current(attempt) {
            self.debug_log("disconnect superseded; local teardown skipped");
            return;
        }

        self.reset_session();
        if let Err(err) = self.storage.remove_item(keys::LAST_WALLET).await {
            self.warn_log(&format!("failed to clear persisted wallet name: {}", err));
        }
        self.debug_log("disconnected");
        self.notify();
    }

    /// Reconnect the wallet persisted by a previous session.
    ///
    /// No-op unless `config.autoconnect` is set. Scheduled by the owning
    /// platform layer shortly after construction; every failure is swallowed
    /// and logged so the construction path can never observe an error.
    pub async fn autoconnect(&self) {
        if !self.config.autoconnect {
            return;
        }
        let name = match self.storage.get_item(keys::LAST_WALLET).await {
            Ok(Some(name)) => name,
            Ok(None) => {
                self.debug_log("no persisted wallet to restore");
                return;
            }
            Err(err) => {
                self.warn_log(&format!("failed to read persisted wallet name: {}", err));
                return;
            }
        };
        let known = self
            .inner
            .borrow()
            .state
            .wallets
            .iter()
            .any(|w| w.name == name);
        if !known {
            self.debug_log(&format!(
                "persisted wallet \"{}\" is no longer available",
                name
            ));
            return;
        }
        if let Err(err) = self.select(&name).await {
            self.warn_log(&format!("auto-connect to \"{}\" failed: {}", name, err));
        }
    }

    /// Current state by value. Mutating the returned snapshot has no effect
    /// on the client.
    pub fn snapshot(&self) -> ConnectorState {
        self.inner.borrow().state.clone()
    }

    /// Register a listener invoked with a fresh snapshot after every state
    /// transition.
    pub fn subscribe(&self, listener: impl Fn(&ConnectorState) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Release registry and change-event subscriptions and clear any session
    /// in progress. Idempotent, safe to call even if never connected, and
    /// also run when the last handle drops. Commands stay callable afterwards
    /// against the now-static wallet list.
    pub fn destroy(&self) {
        let (subs, watch) = {
            let mut inner = self.inner.borrow_mut();
            inner.attempt += 1;
            inner.state.selected_wallet = None;
            inner.state.connected = false;
            inner.state.connecting = false;
            inner.state.accounts.clear();
            inner.state.selected_account = None;
            (std::mem::take(&mut inner.registry_subs), inner.watch.take())
        };
        for unsubscribe in subs {
            unsubscribe();
        }
        drop(watch);
        self.debug_log("connector destroyed");
    }

    /// Re-query the registry and rebuild the wallet list wholesale.
    /// Duplicate names keep the first-seen provider.
    fn refresh_wallets(&self) {
        let registry = match &self.registry {
            Some(registry) => registry,
            None => return,
        };
        let discovered = match registry.providers() {
            Ok(providers) => providers,
            Err(err) => {
                self.warn_log(&format!("wallet discovery failed: {}", err));
                Vec::new()
            }
        };
        let chain = self.config.chain.as_deref();
        let mut wallets: Vec<WalletEntry> = Vec::new();
        for provider in discovered {
            let entry = WalletEntry::from_provider(provider, chain);
            if wallets.iter().any(|w| w.name == entry.name) {
                self.debug_log(&format!("duplicate wallet name \"{}\" ignored", entry.name));
                continue;
            }
            wallets.push(entry);
        }
        self.debug_log(&format!("discovered {} wallet(s)", wallets.len()));
        self.inner.borrow_mut().state.wallets = wallets;
        self.notify();
    }

    /// Start a new connect generation: tear down the previous session so a
    /// mid-connect state is never also connected.
    fn begin_attempt(&self) -> u64 {
        let (attempt, watch) = {
            let mut inner = self.inner.borrow_mut();
            inner.attempt += 1;
            inner.state.connected = false;
            inner.state.connecting = true;
            inner.state.selected_wallet = None;
            inner.state.accounts.clear();
            inner.state.selected_account = None;
            (inner.attempt, inner.watch.take())
        };
        // Guard release runs outside the borrow; it may call back into the
        // provider.
        drop(watch);
        attempt
    }

    fn attempt_is_current(&self, attempt: u64) -> bool {
        self.inner.borrow().attempt == attempt
    }

    fn commit_connected(&self, provider: Rc<dyn WalletProvider>, accounts: Vec<WalletAccount>) {
        let mut inner = self.inner.borrow_mut();
        inner.state.selected_account = accounts.first().map(|a| a.address.clone());
        inner.state.accounts = accounts;
        inner.state.selected_wallet = Some(provider);
        inner.state.connected = true;
        inner.state.connecting = false;
    }

    fn reset_session(&self) {
        let watch = {
            let mut inner = self.inner.borrow_mut();
            inner.state.selected_wallet = None;
            inner.state.connected = false;
            inner.state.connecting = false;
            inner.state.accounts.clear();
            inner.state.selected_account = None;
            inner.watch.take()
        };
        drop(watch);
    }

    async fn persist_wallet_name(&self, name: &str) {
        if let Err(err) = self.storage.set_item(keys::LAST_WALLET, name).await {
            self.warn_log(&format!("failed to persist wallet name: {}", err));
        }
    }

    /// Attach the account-change strategy for a freshly connected provider:
    /// the event strategy when the wallet exposes events, else the installed
    /// poll strategy, else nothing (external collaborators may poll
    /// `snapshot` themselves).
    fn attach_watch(&self, provider: Rc<dyn WalletProvider>, features: FeatureSet) {
        let source: &dyn AccountChangeSource = if features.events {
            &self.event_source
        } else {
            match self.poll_source.as_deref() {
                Some(source) => source,
                None => {
                    self.debug_log(
                        "wallet has no events feature and no poll source; live updates disabled",
                    );
                    return;
                }
            }
        };
        let inner = Rc::downgrade(&self.inner);
        let listener: AccountsListener = Box::new(move |accounts| {
            if let Some(cell) = inner.upgrade() {
                cell.borrow_mut().apply_accounts_update(accounts);
                notify_inner(&cell);
            }
        });
        let watch = source.watch(provider, listener);
        if watch.is_none() {
            self.debug_log("change source declined to watch the wallet");
        }
        self.inner.borrow_mut().watch = watch;
    }

    fn notify(&self) {
        notify_inner(&self.inner);
    }

    fn debug_log(&self, message: &str) {
        if self.config.debug {
            debug!("{}", message);
        }
    }

    // Non-critical failures surface in the log only under the debug flag.
    fn warn_log(&self, message: &str) {
        if self.config.debug {
            warn!("{}", message);
        }
    }
}

impl Drop for WalletConnectorClient {
    fn drop(&mut self) {
        self.destroy();
    }
}
