// Timed-poll account change strategy for the browser

use crate::account_source::{AccountChangeSource, WatchGuard};
use crate::provider::{AccountsListener, WalletProvider};
use gloo_timers::future::TimeoutFuture;
use log::debug;
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;

/// Browser counterpart of the native poll strategy; sleeps on a JS timeout
/// between account reads and reports the list whenever it changes.
pub struct GlooPollSource {
    interval_ms: u32,
}

impl GlooPollSource {
    pub fn new(interval_ms: u32) -> Self {
        Self { interval_ms }
    }
}

impl AccountChangeSource for GlooPollSource {
    fn watch(
        &self,
        provider: Rc<dyn WalletProvider>,
        listener: AccountsListener,
    ) -> Option<WatchGuard> {
        let stopped = Rc::new(Cell::new(false));
        let flag = stopped.clone();
        let interval_ms = self.interval_ms;
        spawn_local(async move {
            let mut previous: Vec<String> = provider
                .accounts()
                .iter()
                .map(|a| a.address.clone())
                .collect();
            loop {
                TimeoutFuture::new(interval_ms).await;
                if flag.get() {
                    break;
                }
                let accounts = provider.accounts();
                let addresses: Vec<String> =
                    accounts.iter().map(|a| a.address.clone()).collect();
                if addresses != previous {
                    previous = addresses;
                    listener(accounts);
                }
            }
            debug!("account poll task stopped");
        });
        Some(WatchGuard::new(move || stopped.set(true)))
    }
}
