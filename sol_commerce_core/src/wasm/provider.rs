// Wrapper around an injected Wallet Standard wallet object

use crate::error::CoreError;
use crate::models::{AccountHandle, FeatureSet, WalletAccount};
use crate::provider::{AccountsListener, ProviderResult, Unsubscriber, WalletProvider};
use async_trait::async_trait;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

pub const FEATURE_CONNECT: &str = "standard:connect";
pub const FEATURE_DISCONNECT: &str = "standard:disconnect";
pub const FEATURE_EVENTS: &str = "standard:events";
pub const FEATURE_SIGN: &str = "solana:signTransaction";
pub const FEATURE_SIGN_AND_SEND: &str = "solana:signAndSendTransaction";

/// A wallet object handed over by the browser, adapted to [`WalletProvider`].
///
/// The feature bag is probed once at wrap time; all later calls go through
/// `Reflect` against the retained JS object.
pub struct JsWalletProvider {
    wallet: js_sys::Object,
    name: String,
    icon: Option<String>,
    chains: Vec<String>,
    features: FeatureSet,
}

impl JsWalletProvider {
    pub fn from_js(value: JsValue) -> Result<Self, CoreError> {
        let wallet: js_sys::Object = value
            .dyn_into()
            .map_err(|_| CoreError::Provider("registered wallet is not an object".to_string()))?;
        let name = string_prop(wallet.as_ref(), "name")
            .ok_or_else(|| CoreError::Provider("registered wallet has no name".to_string()))?;
        let icon = string_prop(wallet.as_ref(), "icon");
        let chains = string_array_prop(wallet.as_ref(), "chains");
        let features = probe_features(wallet.as_ref());
        debug!("wrapped wallet \"{}\" with features {:?}", name, features);
        Ok(Self {
            wallet,
            name,
            icon,
            chains,
            features,
        })
    }

    /// Look up `features[feature][method]`, call it on the feature object and
    /// await the result when it is a promise.
    async fn call_feature(&self, feature: &str, method: &str) -> Result<JsValue, CoreError> {
        let features = js_sys::Reflect::get(self.wallet.as_ref(), &JsValue::from_str("features"))
            .map_err(|e| CoreError::Provider(format!("wallet has no features object: {:?}", e)))?;
        let entry = js_sys::Reflect::get(&features, &JsValue::from_str(feature))
            .map_err(|e| CoreError::Provider(format!("feature {} unavailable: {:?}", feature, e)))?;
        if entry.is_undefined() || entry.is_null() {
            return Err(CoreError::UnsupportedWallet(format!(
                "{} does not implement {}",
                self.name, feature
            )));
        }
        let method_fn = js_sys::Reflect::get(&entry, &JsValue::from_str(method))
            .map_err(|e| CoreError::Provider(format!("method {} missing: {:?}", method, e)))?;
        let function = method_fn
            .dyn_into::<js_sys::Function>()
            .map_err(|_| CoreError::Provider(format!("{}.{} is not a function", feature, method)))?;

        let result = function
            .call0(&entry)
            .map_err(|e| CoreError::Provider(format!("{}.{} failed: {:?}", feature, method, e)))?;

        // If result is a promise, await it
        if result.has_type::<js_sys::Promise>() {
            let promise = result
                .dyn_into::<js_sys::Promise>()
                .map_err(|_| CoreError::Provider("promise cast failed".to_string()))?;
            JsFuture::from(promise).await.map_err(|e| {
                CoreError::Provider(format!("{}.{} rejected: {:?}", feature, method, e))
            })
        } else {
            Ok(result)
        }
    }
}

#[async_trait(?Send)]
impl WalletProvider for JsWalletProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    fn chains(&self) -> &[String] {
        &self.chains
    }

    fn features(&self) -> FeatureSet {
        self.features
    }

    fn accounts(&self) -> Vec<WalletAccount> {
        match js_sys::Reflect::get(self.wallet.as_ref(), &JsValue::from_str("accounts")) {
            Ok(value) => parse_accounts(&value),
            Err(_) => Vec::new(),
        }
    }

    async fn connect(&self) -> ProviderResult<Vec<WalletAccount>> {
        let result = self.call_feature(FEATURE_CONNECT, "connect").await?;
        // standard:connect resolves { accounts }; fall back to the wallet's
        // own accounts array for non-conforming responses
        let value = js_sys::Reflect::get(&result, &JsValue::from_str("accounts"))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null());
        let accounts = match value {
            Some(value) => parse_accounts(&value),
            None => self.accounts(),
        };
        Ok(accounts)
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.call_feature(FEATURE_DISCONNECT, "disconnect").await?;
        Ok(())
    }

    fn subscribe_change(&self, listener: AccountsListener) -> Option<Unsubscriber> {
        if !self.features.events {
            return None;
        }
        let features =
            js_sys::Reflect::get(self.wallet.as_ref(), &JsValue::from_str("features")).ok()?;
        let events = js_sys::Reflect::get(&features, &JsValue::from_str(FEATURE_EVENTS)).ok()?;
        if events.is_undefined() || events.is_null() {
            return None;
        }
        let on = js_sys::Reflect::get(&events, &JsValue::from_str("on")).ok()?;
        let on: js_sys::Function = on.dyn_into().ok()?;

        let wallet = self.wallet.clone();
        let callback = Closure::wrap(Box::new(move |properties: JsValue| {
            // Change events carry only the mutated properties; fall back to
            // the wallet's accounts array when the list is absent.
            let value = js_sys::Reflect::get(&properties, &JsValue::from_str("accounts"))
                .ok()
                .filter(|v| !v.is_undefined() && !v.is_null())
                .or_else(|| {
                    js_sys::Reflect::get(wallet.as_ref(), &JsValue::from_str("accounts")).ok()
                });
            let accounts = match value {
                Some(value) => parse_accounts(&value),
                None => Vec::new(),
            };
            listener(accounts);
        }) as Box<dyn FnMut(JsValue)>);

        let off = match on.call2(&events, &JsValue::from_str("change"), callback.as_ref()) {
            Ok(off) => off.dyn_into::<js_sys::Function>().ok(),
            Err(err) => {
                warn!("standard:events on() failed: {:?}", err);
                return None;
            }
        };

        // The callback closure stays alive inside the unsubscriber until the
        // wallet-side off() has run.
        Some(Box::new(move || {
            if let Some(off) = &off {
                if let Err(err) = off.call0(&JsValue::UNDEFINED) {
                    warn!("standard:events off() failed: {:?}", err);
                }
            }
            drop(callback);
        }))
    }
}

fn string_prop(target: &JsValue, key: &str) -> Option<String> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}

fn string_array_prop(target: &JsValue, key: &str) -> Vec<String> {
    let value = match js_sys::Reflect::get(target, &JsValue::from_str(key)) {
        Ok(value) => value,
        Err(_) => return Vec::new(),
    };
    let array = match value.dyn_into::<js_sys::Array>() {
        Ok(array) => array,
        Err(_) => return Vec::new(),
    };
    array.iter().filter_map(|v| v.as_string()).collect()
}

fn probe_features(wallet: &JsValue) -> FeatureSet {
    let features = js_sys::Reflect::get(wallet, &JsValue::from_str("features"))
        .unwrap_or(JsValue::UNDEFINED);
    let has = |name: &str| {
        js_sys::Reflect::get(&features, &JsValue::from_str(name))
            .map(|v| !v.is_undefined() && !v.is_null())
            .unwrap_or(false)
    };
    FeatureSet {
        connect: has(FEATURE_CONNECT),
        disconnect: has(FEATURE_DISCONNECT),
        events: has(FEATURE_EVENTS),
        sign: has(FEATURE_SIGN) || has(FEATURE_SIGN_AND_SEND),
    }
}

/// Parse a Wallet Standard accounts array, retaining each original JS account
/// object for downstream signing calls.
pub(crate) fn parse_accounts(value: &JsValue) -> Vec<WalletAccount> {
    let array = match value.clone().dyn_into::<js_sys::Array>() {
        Ok(array) => array,
        Err(_) => return Vec::new(),
    };
    let mut accounts = Vec::new();
    for entry in array.iter() {
        let address = match string_prop(&entry, "address") {
            Some(address) => address,
            None => continue,
        };
        let mut account = WalletAccount::new(address);
        account.icon = string_prop(&entry, "icon");
        account.raw = AccountHandle::new(entry);
        accounts.push(account);
    }
    accounts
}
