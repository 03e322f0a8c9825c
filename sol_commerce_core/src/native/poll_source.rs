// Timed-poll account change strategy on the tokio runtime

use crate::account_source::{AccountChangeSource, WatchGuard};
use crate::provider::{AccountsListener, WalletProvider};
use log::debug;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Reads `provider.accounts()` on an interval and reports the list whenever
/// it differs from the previous read. Installed for wallets that expose no
/// events feature.
///
/// The poll task is spawned with `spawn_local`; callers must be running
/// inside a `tokio::task::LocalSet`.
pub struct TokioPollSource {
    interval: Duration,
}

impl TokioPollSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AccountChangeSource for TokioPollSource {
    fn watch(
        &self,
        provider: Rc<dyn WalletProvider>,
        listener: AccountsListener,
    ) -> Option<WatchGuard> {
        let stopped = Rc::new(Cell::new(false));
        let flag = stopped.clone();
        let interval = self.interval;
        tokio::task::spawn_local(async move {
            let mut previous: Vec<String> = provider
                .accounts()
                .iter()
                .map(|a| a.address.clone())
                .collect();
            loop {
                tokio::time::sleep(interval).await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::models::{FeatureSet, WalletAccount};
    use crate::provider::{ProviderResult, Unsubscriber};
    use async_trait::async_trait;
    use std::cell::RefCell;

    struct PollTarget {
        accounts: RefCell<Vec<WalletAccount>>,
    }

    impl PollTarget {
        fn new(addresses: &[&str]) -> Rc<Self> {
            Rc::new(Self {
                accounts: RefCell::new(
                    addresses.iter().map(|a| WalletAccount::new(*a)).collect(),
                ),
            })
        }

        fn set(&self, addresses: &[&str]) {
            *self.accounts.borrow_mut() =
                addresses.iter().map(|a| WalletAccount::new(*a)).collect();
        }
    }

    #[async_trait(?Send)]
    impl WalletProvider for PollTarget {
        fn name(&self) -> &str {
            "PollTarget"
        }

        fn icon(&self) -> Option<&str> {
            None
        }

        fn chains(&self) -> &[String] {
            &[]
        }

        fn features(&self) -> FeatureSet {
            FeatureSet {
                connect: true,
                disconnect: true,
                ..FeatureSet::default()
            }
        }

        fn accounts(&self) -> Vec<WalletAccount> {
            self.accounts.borrow().clone()
        }

        async fn connect(&self) -> ProviderResult<Vec<WalletAccount>> {
            Ok(self.accounts.borrow().clone())
        }

        async fn disconnect(&self) -> ProviderResult<()> {
            Err(CoreError::Provider("not supported".to_string()))
        }

        fn subscribe_change(&self, _listener: AccountsListener) -> Option<Unsubscriber> {
            None
        }
    }

    fn recording_listener(
        seen: &Rc<RefCell<Vec<Vec<String>>>>,
    ) -> AccountsListener {
        let sink = seen.clone();
        Box::new(move |accounts| {
            sink.borrow_mut()
                .push(accounts.iter().map(|a| a.address.clone()).collect());
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_changed_account_list() {
        let provider = PollTarget::new(&["Addr1"]);
        let source = TokioPollSource::new(Duration::from_millis(50));
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let guard = source.watch(
                    provider.clone() as Rc<dyn WalletProvider>,
                    recording_listener(&seen),
                );
                assert!(guard.is_some());
                let _guard = guard;

                // Unchanged list produces no report
                tokio::time::sleep(Duration::from_millis(60)).await;
                assert!(seen.borrow().is_empty());

                provider.set(&["Addr2"]);
                tokio::time::sleep(Duration::from_millis(60)).await;
                assert_eq!(seen.borrow().len(), 1);
                assert_eq!(seen.borrow()[0], vec!["Addr2".to_string()]);

                // Stable list again, no further reports
                tokio::time::sleep(Duration::from_millis(120)).await;
                assert_eq!(seen.borrow().len(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_guard_stops_the_poll() {
        let provider = PollTarget::new(&["Addr1"]);
        let source = TokioPollSource::new(Duration::from_millis(50));
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let guard = source.watch(
                    provider.clone() as Rc<dyn WalletProvider>,
                    recording_listener(&seen),
                );
                drop(guard);

                provider.set(&["Addr2"]);
                tokio::time::sleep(Duration::from_millis(200)).await;
                assert!(seen.borrow().is_empty());
            })
            .await;
    }
}
