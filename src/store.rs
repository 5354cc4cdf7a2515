//! In-memory rate store with an ordered subscriber registry
//!
//! The store owns the current `RateSnapshot` and the list of subscribers.
//! Every mutation bumps the snapshot revision and synchronously fans the
//! full snapshot out to all subscribers in registration order. Locks are
//! never held while a callback runs, except the subscriber's own delivery
//! lock, which keeps its deliveries ordered by revision.

use crate::{
    error::PriceError,
    types::{FallbackRates, LiveRates, RateSnapshot},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Callback invoked with every snapshot a subscriber receives
pub type SubscriberCallback = Box<dyn Fn(&RateSnapshot) + Send + Sync>;

/// Identifies one registration in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

struct Subscriber {
    id: SubscriptionId,
    callback: SubscriberCallback,
    active: AtomicBool,
    /// Revision last handed to the callback; held for the duration of a delivery
    delivered: Mutex<Option<u64>>,
}

impl Subscriber {
    fn deliver(&self, snapshot: &RateSnapshot) {
        let mut delivered = lock(&self.delivered);
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if matches!(*delivered, Some(revision) if revision >= snapshot.revision) {
            return;
        }
        self.invoke(snapshot);
        *delivered = Some(snapshot.revision);
    }

    /// Runs the callback; a panic is logged and does not reach the caller
    fn invoke(&self, snapshot: &RateSnapshot) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(snapshot))) {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic");
            tracing::error!(
                subscription = %self.id,
                revision = snapshot.revision,
                reason,
                "Subscriber callback panicked"
            );
        }
    }
}

struct StoreState {
    snapshot: RateSnapshot,
    subscribers: Vec<Arc<Subscriber>>,
    closed: bool,
}

/// Rate snapshot plus subscriber registry
pub struct PriceStore {
    state: Mutex<StoreState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PriceStore {
    /// Creates a store seeded with the fallback rates
    pub fn new(fallback: FallbackRates) -> Self {
        Self {
            state: Mutex::new(StoreState {
                snapshot: RateSnapshot::from_fallback(fallback),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Returns a copy of the current snapshot
    pub fn current(&self) -> RateSnapshot {
        lock(&self.state).snapshot.clone()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Registers a subscriber and hands it the current snapshot before returning
    ///
    /// # Returns
    /// The new subscription id and the subscriber count after registration
    pub fn subscribe(
        &self,
        callback: SubscriberCallback,
    ) -> Result<(SubscriptionId, usize), PriceError> {
        let subscriber = Arc::new(Subscriber {
            id: SubscriptionId::new(),
            callback,
            active: AtomicBool::new(true),
            delivered: Mutex::new(None),
        });

        // Held across registration so no notification can reach this
        // subscriber before its initial snapshot.
        let mut delivered = lock(&subscriber.delivered);
        let (snapshot, count) = {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(PriceError::Disposed);
            }
            state.subscribers.push(subscriber.clone());
            (state.snapshot.clone(), state.subscribers.len())
        };

        subscriber.invoke(&snapshot);
        *delivered = Some(snapshot.revision);

        tracing::debug!(subscription = %subscriber.id, subscribers = count, "Subscriber registered");
        Ok((subscriber.id, count))
    }

    /// Removes a subscriber
    ///
    /// # Returns
    /// The remaining subscriber count, or `None` if the id was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> Option<usize> {
        let mut state = lock(&self.state);
        let index = state.subscribers.iter().position(|s| s.id == id)?;
        let removed = state.subscribers.remove(index);
        removed.active.store(false, Ordering::Release);

        let remaining = state.subscribers.len();
        tracing::debug!(subscription = %id, subscribers = remaining, "Subscriber removed");
        Some(remaining)
    }

    /// Drops every subscriber and refuses new ones
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        for subscriber in state.subscribers.drain(..) {
            subscriber.active.store(false, Ordering::Release);
        }
    }

    /// Marks a fetch cycle as in flight
    pub fn begin_fetch(&self) -> RateSnapshot {
        self.mutate(|snapshot| {
            snapshot.is_loading = true;
            snapshot.error = None;
        })
    }

    /// Applies a successful fetch: all three rates change in one notification
    pub fn apply_rates(&self, rates: LiveRates) -> RateSnapshot {
        self.mutate(|snapshot| snapshot.apply_live(rates))
    }

    /// Applies a failed fetch: rates are kept, the error message is set
    pub fn apply_failure(&self, message: &str) -> RateSnapshot {
        self.mutate(|snapshot| {
            snapshot.is_loading = false;
            snapshot.error = Some(message.to_string());
        })
    }

    fn mutate<F>(&self, update: F) -> RateSnapshot
    where
        F: FnOnce(&mut RateSnapshot),
    {
        let (snapshot, subscribers) = {
            let mut state = lock(&self.state);
            update(&mut state.snapshot);
            state.snapshot.revision += 1;
            (state.snapshot.clone(), state.subscribers.clone())
        };

        for subscriber in &subscribers {
            subscriber.deliver(&snapshot);
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FALLBACK_RATES;

    type Received = Arc<Mutex<Vec<RateSnapshot>>>;

    fn recorder() -> (Received, SubscriberCallback) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let callback: SubscriberCallback =
            Box::new(move |snapshot: &RateSnapshot| sink.lock().unwrap().push(snapshot.clone()));
        (received, callback)
    }

    #[test]
    fn test_subscribe_delivers_current_snapshot_immediately() {
        let store = PriceStore::new(FALLBACK_RATES);
        let (received, callback) = recorder();

        let (_, count) = store.subscribe(callback).unwrap();

        assert_eq!(count, 1);
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].icp_usd, 4.93);
        assert_eq!(received[0].revision, 0);
    }

    #[test]
    fn test_notifications_follow_registration_order() {
        let store = PriceStore::new(FALLBACK_RATES);
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = order.clone();
            store
                .subscribe(Box::new(move |snapshot: &RateSnapshot| {
                    if snapshot.revision > 0 {
                        order.lock().unwrap().push(name);
                    }
                }))
                .unwrap();
        }

        store.begin_fetch();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let store = PriceStore::new(FALLBACK_RATES);
        let (received, callback) = recorder();
        let (id, _) = store.subscribe(callback).unwrap();

        assert_eq!(store.unsubscribe(id), Some(0));
        assert_eq!(store.unsubscribe(id), None);

        store.begin_fetch();
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_keeps_rates_and_sets_error() {
        let store = PriceStore::new(FALLBACK_RATES);
        store.apply_rates(LiveRates::derive(5.0, 4.6, 10.5));

        store.begin_fetch();
        let snapshot = store.apply_failure("upstream down");

        assert_eq!(snapshot.icp_usd, 5.0);
        assert_eq!(snapshot.icp_ghs, 52.5);
        assert_eq!(snapshot.icp_eur, 4.6);
        assert_eq!(snapshot.error.as_deref(), Some("upstream down"));
        assert!(!snapshot.is_loading);
    }

    #[test]
    fn test_success_after_failure_updates_atomically() {
        let store = PriceStore::new(FALLBACK_RATES);
        store.apply_failure("upstream down");
        let (received, callback) = recorder();
        store.subscribe(callback).unwrap();

        store.apply_rates(LiveRates::derive(6.0, 5.5, 11.0));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        let before = &received[0];
        let after = &received[1];
        assert_eq!(before.icp_usd, 4.93);
        assert!(before.error.is_some());
        assert_eq!(after.icp_usd, 6.0);
        assert_eq!(after.icp_ghs, 66.0);
        assert_eq!(after.icp_eur, 5.5);
        assert!(after.error.is_none());
    }

    #[test]
    fn test_begin_fetch_sets_loading_and_clears_error() {
        let store = PriceStore::new(FALLBACK_RATES);
        store.apply_failure("upstream down");

        let snapshot = store.begin_fetch();

        assert!(snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.revision, 2);
    }

    #[test]
    fn test_subscriber_never_sees_older_revision() {
        let store = PriceStore::new(FALLBACK_RATES);
        let (received, callback) = recorder();
        store.subscribe(callback).unwrap();

        let newer = store.apply_rates(LiveRates::derive(6.0, 5.5, 11.0));
        let mut older = newer.clone();
        older.revision = newer.revision - 1;
        older.icp_usd = 1.0;

        let subscribers = lock(&store.state).subscribers.clone();
        subscribers[0].deliver(&older);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].icp_usd, 6.0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let store = Arc::new(PriceStore::new(FALLBACK_RATES));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let inner_store = store.clone();
        let inner_slot = slot.clone();
        let inner_calls = calls.clone();
        let (id, _) = store
            .subscribe(Box::new(move |_snapshot: &RateSnapshot| {
                *inner_calls.lock().unwrap() += 1;
                if let Some(id) = *inner_slot.lock().unwrap() {
                    inner_store.unsubscribe(id);
                }
            }))
            .unwrap();
        *slot.lock().unwrap() = Some(id);

        store.begin_fetch();
        store.apply_failure("upstream down");

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_block_later_subscribers() {
        let store = PriceStore::new(FALLBACK_RATES);
        store
            .subscribe(Box::new(|snapshot: &RateSnapshot| {
                if snapshot.revision > 0 {
                    panic!("subscriber failed");
                }
            }))
            .unwrap();
        let (received, callback) = recorder();
        store.subscribe(callback).unwrap();

        store.begin_fetch();
        let snapshot = store.apply_rates(LiveRates::derive(6.0, 5.5, 11.0));

        assert!(!snapshot.is_loading);
        assert_eq!(store.subscriber_count(), 2);
        let received = received.lock().unwrap();
        let revisions: Vec<u64> = received.iter().map(|s| s.revision).collect();
        assert_eq!(revisions, vec![0, 1, 2]);
        assert_eq!(received[2].icp_usd, 6.0);
    }

    #[test]
    fn test_closed_store_rejects_subscribers() {
        let store = PriceStore::new(FALLBACK_RATES);
        let (received, callback) = recorder();
        store.subscribe(callback).unwrap();

        store.close();

        assert!(store.is_closed());
        assert_eq!(store.subscriber_count(), 0);
        let (_, callback) = recorder();
        assert!(matches!(store.subscribe(callback), Err(PriceError::Disposed)));
        store.begin_fetch();
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
