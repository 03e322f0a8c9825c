// Account-change detection abstraction
// Allows both event-subscription (provider events feature) and timed-poll strategies

use crate::provider::{AccountsListener, WalletProvider};
use std::rc::Rc;

/// Releases an account-change watch (event subscription or poll task) when
/// dropped. Release runs at most once.
pub struct WatchGuard {
    release: Option<Box<dyn FnOnce()>>,
}

impl WatchGuard {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Strategy for observing a connected provider's account list.
///
/// One strategy is chosen per connected provider: the event strategy when the
/// provider exposes an events feature, otherwise a host-installed timed-poll
/// strategy. The connector never needs to know which is active.
pub trait AccountChangeSource {
    /// Start watching `provider`, reporting every account-list change to
    /// `listener`. Returns `None` when this source cannot watch the provider.
    fn watch(&self, provider: Rc<dyn WalletProvider>, listener: AccountsListener)
        -> Option<WatchGuard>;
}

/// Event-subscription strategy backed by the provider's own events feature.
pub struct ProviderEventSource;

impl AccountChangeSource for ProviderEventSource {
    fn watch(
        &self,
        provider: Rc<dyn WalletProvider>,
        listener: AccountsListener,
    ) -> Option<WatchGuard> {
        let unsubscribe = provider.subscribe_change(listener)?;
        Some(WatchGuard::new(move || unsubscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureSet, WalletAccount};
    use crate::provider::{ProviderResult, Unsubscriber};
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};

    struct EventedProvider {
        has_events: bool,
        listener: Rc<RefCell<Option<Rc<dyn Fn(Vec<WalletAccount>)>>>>,
        unsubscribed: Rc<Cell<bool>>,
    }

    impl EventedProvider {
        fn new(has_events: bool) -> Self {
            Self {
                has_events,
                listener: Rc::new(RefCell::new(None)),
                unsubscribed: Rc::new(Cell::new(false)),
            }
        }

        fn fire(&self, accounts: Vec<WalletAccount>) {
            let listener = self.listener.borrow().clone();
            if let Some(listener) = listener {
                listener(accounts);
            }
        }
    }

    #[async_trait(?Send)]
    impl WalletProvider for EventedProvider {
        fn name(&self) -> &str {
            "Evented"
        }

        fn icon(&self) -> Option<&str> {
            None
        }

        fn chains(&self) -> &[String] {
            &[]
        }

        fn features(&self) -> FeatureSet {
            FeatureSet {
                events: self.has_events,
                ..FeatureSet::full()
            }
        }

        fn accounts(&self) -> Vec<WalletAccount> {
            Vec::new()
        }

        async fn connect(&self) -> ProviderResult<Vec<WalletAccount>> {
            Ok(Vec::new())
        }

        async fn disconnect(&self) -> ProviderResult<()> {
            Ok(())
        }

        fn subscribe_change(&self, listener: AccountsListener) -> Option<Unsubscriber> {
            if !self.has_events {
                return None;
            }
            *self.listener.borrow_mut() = Some(Rc::from(listener));
            let slot = self.listener.clone();
            let flag = self.unsubscribed.clone();
            Some(Box::new(move || {
                flag.set(true);
                slot.borrow_mut().take();
            }))
        }
    }

    #[test]
    fn event_source_relays_change_notifications() {
        let provider = Rc::new(EventedProvider::new(true));
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let guard = ProviderEventSource.watch(
            provider.clone(),
            Box::new(move |accounts| sink.borrow_mut().push(accounts.len())),
        );
        assert!(guard.is_some());

        provider.fire(vec![WalletAccount::new("Addr1"), WalletAccount::new("Addr2")]);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let provider = Rc::new(EventedProvider::new(true));
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let guard = ProviderEventSource
            .watch(
                provider.clone(),
                Box::new(move |accounts| sink.borrow_mut().push(accounts.len())),
            )
            .unwrap();
        drop(guard);

        assert!(provider.unsubscribed.get());
        provider.fire(vec![WalletAccount::new("Addr1")]);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn event_source_declines_providers_without_events() {
        let provider = Rc::new(EventedProvider::new(false));
        let guard = ProviderEventSource.watch(provider, Box::new(|_| {}));
        assert!(guard.is_none());
    }
}
