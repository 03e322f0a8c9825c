// Window-level wallet discovery via the register-wallet handshake

use crate::error::CoreError;
use crate::provider::{ProviderResult, RegistryListener, Unsubscriber, WalletProvider, WalletRegistry};
use crate::wasm::provider::JsWalletProvider;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::window;

pub const REGISTER_WALLET_EVENT: &str = "wallet-standard:register-wallet";
pub const APP_READY_EVENT: &str = "wallet-standard:app-ready";

#[derive(Default)]
struct RegistryShared {
    wallets: RefCell<Vec<(u64, Rc<JsWalletProvider>)>>,
    register_listeners: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
    unregister_listeners: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
    next_id: Cell<u64>,
}

impl RegistryShared {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Adopt a wallet object handed over by the page and return the JS
    /// unregister function the handshake requires.
    fn register_wallet(self: &Rc<Self>, wallet: JsValue) -> JsValue {
        let provider = match JsWalletProvider::from_js(wallet) {
            Ok(provider) => Rc::new(provider),
            Err(err) => {
                warn!("ignoring malformed wallet registration: {}", err);
                return Closure::once_into_js(|| {});
            }
        };
        let token = self.next_id();
        let name = provider.name().to_string();
        self.wallets.borrow_mut().push((token, provider));
        debug!("wallet registered: {}", name);
        self.fire(&self.register_listeners);

        let shared = self.clone();
        Closure::once_into_js(move || {
            let removed = {
                let mut wallets = shared.wallets.borrow_mut();
                let before = wallets.len();
                wallets.retain(|(t, _)| *t != token);
                wallets.len() != before
            };
            if removed {
                debug!("wallet unregistered: {}", name);
                shared.fire(&shared.unregister_listeners);
            }
        })
    }

    fn subscribe(self: &Rc<Self>, register: bool, listener: RegistryListener) -> Unsubscriber {
        let id = self.next_id();
        let list = if register {
            &self.register_listeners
        } else {
            &self.unregister_listeners
        };
        list.borrow_mut().push((id, Rc::from(listener)));

        let shared = self.clone();
        Box::new(move || {
            let list = if register {
                &shared.register_listeners
            } else {
                &shared.unregister_listeners
            };
            list.borrow_mut().retain(|(i, _)| *i != id);
        })
    }

    fn fire(&self, listeners: &RefCell<Vec<(u64, Rc<dyn Fn()>)>>) {
        let snapshot: Vec<Rc<dyn Fn()>> =
            listeners.borrow().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener();
        }
    }
}

/// Wallet discovery over the window handshake: wallets that load after us
/// announce themselves with a register-wallet event, and our app-ready
/// dispatch reaches wallets that loaded first. Either way the wallet ends up
/// calling the `register` function we expose.
pub struct WindowRegistry {
    shared: Rc<RegistryShared>,
    // These closures must be kept alive for the window and wallets to call
    #[allow(dead_code)]
    register_fn: Closure<dyn FnMut(JsValue) -> JsValue>,
    on_register_event: Closure<dyn FnMut(web_sys::Event)>,
}

impl WindowRegistry {
    pub fn new() -> Result<Self, CoreError> {
        let window =
            window().ok_or_else(|| CoreError::Init("No window object available".to_string()))?;
        let shared = Rc::new(RegistryShared::default());

        // The register API object handed to wallets during the handshake
        let register_shared = shared.clone();
        let register_fn = Closure::wrap(Box::new(move |wallet: JsValue| -> JsValue {
            register_shared.register_wallet(wallet)
        }) as Box<dyn FnMut(JsValue) -> JsValue>);
        let api = js_sys::Object::new();
        js_sys::Reflect::set(&api, &JsValue::from_str("register"), register_fn.as_ref())
            .map_err(|e| CoreError::Init(format!("Failed to build register api: {:?}", e)))?;

        // Wallets loading after us dispatch this event with a callback that
        // expects the register API.
        let event_api = JsValue::from(api.clone());
        let on_register_event = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let custom: web_sys::CustomEvent = match event.dyn_into() {
                Ok(custom) => custom,
                Err(_) => return,
            };
            let callback: js_sys::Function = match custom.detail().dyn_into() {
                Ok(callback) => callback,
                Err(_) => {
                    warn!("register-wallet event without callback detail");
                    return;
                }
            };
            if let Err(err) = callback.call1(&JsValue::UNDEFINED, &event_api) {
                warn!("wallet registration callback failed: {:?}", err);
            }
        }) as Box<dyn FnMut(_)>);
        window
            .add_event_listener_with_callback(
                REGISTER_WALLET_EVENT,
                on_register_event.as_ref().unchecked_ref(),
            )
            .map_err(|e| CoreError::Init(format!("Failed to attach register listener: {:?}", e)))?;

        // Announce readiness so wallets that loaded before us register now
        let init = web_sys::CustomEventInit::new();
        init.set_detail(api.as_ref());
        let ready = web_sys::CustomEvent::new_with_event_init_dict(APP_READY_EVENT, &init)
            .map_err(|e| CoreError::Init(format!("Failed to build app-ready event: {:?}", e)))?;
        if window.dispatch_event(&ready).is_err() {
            warn!("app-ready dispatch failed; pre-loaded wallets will not register");
        }

        Ok(Self {
            shared,
            register_fn,
            on_register_event,
        })
    }
}

impl WalletRegistry for WindowRegistry {
    fn providers(&self) -> ProviderResult<Vec<Rc<dyn WalletProvider>>> {
        Ok(self
            .shared
            .wallets
            .borrow()
            .iter()
            .map(|(_, w)| w.clone() as Rc<dyn WalletProvider>)
            .collect())
    }

    fn on_register(&self, listener: RegistryListener) -> Unsubscriber {
        self.shared.subscribe(true, listener)
    }

    fn on_unregister(&self, listener: RegistryListener) -> Unsubscriber {
        self.shared.subscribe(false, listener)
    }
}

impl Drop for WindowRegistry {
    fn drop(&mut self) {
        if let Some(window) = window() {
            let _ = window.remove_event_listener_with_callback(
                REGISTER_WALLET_EVENT,
                self.on_register_event.as_ref().unchecked_ref(),
            );
        }
    }
}
