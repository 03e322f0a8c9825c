// Sol Commerce WASM Bindings
// Browser-facing wallet connector for the commerce widget

use log::{info, warn};
use sol_commerce_core::wasm::browser_env;
use sol_commerce_core::{ConnectorConfig, ConnectorEnv, Subscription, WalletConnectorClient};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

// Initialize panic hook and logger for WASM
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Browser handle to the wallet connector.
///
/// One instance per widget mount; the embedding page constructs it, holds it
/// for the page lifetime and calls `destroy` on unmount.
#[wasm_bindgen]
pub struct CommerceConnect {
    client: Rc<WalletConnectorClient>,
    subscriptions: RefCell<HashMap<u32, Subscription>>,
    next_subscription: Cell<u32>,
}

#[wasm_bindgen]
impl CommerceConnect {
    /// Create a connector against the current window. `config_json` accepts
    /// the JSON configuration document; pass nothing for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<CommerceConnect, JsValue> {
        let config = match config_json {
            Some(doc) => ConnectorConfig::from_json(&doc)
                .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))?,
            None => ConnectorConfig::default(),
        };

        let env = match browser_env(&config) {
            Ok(env) => env,
            Err(err) => {
                // No window available (e.g. SSR prerender): start headless
                // instead of failing
                info!("browser environment unavailable ({}), starting headless", err);
                ConnectorEnv::headless()
            }
        };

        let autoconnect = config.autoconnect;
        let client = WalletConnectorClient::new(config, env);
        if autoconnect {
            let client = client.clone();
            spawn_local(async move {
                client.autoconnect().await;
            });
        }
        info!("commerce connector initialized");

        Ok(CommerceConnect {
            client,
            subscriptions: RefCell::new(HashMap::new()),
            next_subscription: Cell::new(0),
        })
    }

    /// Current state snapshot as a JS object.
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.client.snapshot())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize state: {}", e)))
    }

    /// Discovered wallets as a JS array.
    #[wasm_bindgen]
    pub fn wallets(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.client.snapshot().wallets)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize wallets: {}", e)))
    }

    /// Register a listener invoked with a fresh state object after every
    /// transition. Returns an id for `unsubscribe`.
    #[wasm_bindgen]
    pub fn subscribe(&self, callback: js_sys::Function) -> u32 {
        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        let subscription = self.client.subscribe(move |state| {
            match serde_wasm_bindgen::to_value(state) {
                Ok(value) => {
                    if let Err(err) = callback.call1(&JsValue::UNDEFINED, &value) {
                        warn!("subscriber callback failed: {:?}", err);
                    }
                }
                Err(err) => warn!("failed to serialize state for subscriber: {}", err),
            }
        });
        self.subscriptions.borrow_mut().insert(id, subscription);
        id
    }

    /// Remove a listener registered with `subscribe`. Unknown ids are
    /// ignored; removing twice is harmless.
    #[wasm_bindgen]
    pub fn unsubscribe(&self, id: u32) {
        if let Some(subscription) = self.subscriptions.borrow_mut().remove(&id) {
            subscription.unsubscribe();
        }
    }

    /// Connect the wallet with the given name.
    #[wasm_bindgen]
    pub async fn select(&self, name: String) -> Result<(), JsValue> {
        self.client
            .select(&name)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Select one of the connected wallet's accounts by address.
    #[wasm_bindgen(js_name = selectAccount)]
    pub async fn select_account(&self, address: String) -> Result<(), JsValue> {
        self.client
            .select_account(&address)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Disconnect the current wallet. Never throws.
    #[wasm_bindgen]
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    /// Whether a wallet session is currently established.
    #[wasm_bindgen(js_name = isConnected)]
    pub fn is_connected(&self) -> bool {
        self.client.snapshot().connected
    }

    /// Name of the connected wallet, if any.
    #[wasm_bindgen(js_name = selectedWallet)]
    pub fn selected_wallet(&self) -> Option<String> {
        self.client
            .snapshot()
            .selected_wallet_name()
            .map(|n| n.to_string())
    }

    /// Release listeners and discovery subscriptions. The handle stays
    /// usable; commands run against the wallet list as last discovered.
    #[wasm_bindgen]
    pub fn destroy(&self) {
        for (_, subscription) in self.subscriptions.borrow_mut().drain() {
            subscription.unsubscribe();
        }
        self.client.destroy();
        info!("commerce connector destroyed");
    }
}
