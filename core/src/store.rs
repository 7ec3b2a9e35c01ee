//! Observable keyed record store
//!
//! Generic in-memory `id -> record` mapping with a snapshot-based
//! publish/subscribe mechanism. Pure storage plus fan-out; domain logic
//! lives in the components built on top (see `timers`).
//!
//! # Notification contract
//!
//! Every mutating operation notifies all subscribers synchronously before
//! returning, with an independent snapshot of the full store. `set` and
//! `remove` notify unconditionally (no change detection); bulk operations
//! (`set_many`, `retain`, `clear`) notify exactly once per call. The
//! listener set is copied out before iteration, so listeners may
//! re-entrantly subscribe, unsubscribe, or mutate the store.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

/// A record that can live in an [`EntityStore`].
pub trait Entity: Clone {
    /// Unique identifier. Immutable once inserted.
    fn id(&self) -> &str;
}

/// Callback invoked with a snapshot of all records after every mutation.
pub type Listener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Token returned by [`EntityStore::subscribe`]; pass it back to
/// [`EntityStore::unsubscribe`] to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

struct StoreInner<T> {
    records: HashMap<String, T>,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_subscription: u64,
}

/// Observable keyed store of records.
///
/// Shared by handle (`&EntityStore` or inside an `Arc`); all methods take
/// `&self`. Snapshot order is not meaningful to callers.
pub struct EntityStore<T: Entity> {
    inner: Mutex<StoreInner<T>>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                listeners: Vec::new(),
                next_subscription: 0,
            }),
        }
    }

    /// Apply a mutation, then fan the resulting snapshot out to every
    /// subscriber. The lock is released before any listener runs so
    /// listeners can re-enter the store.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreInner<T>) -> R) -> R {
        let (result, snapshot, listeners) = {
            let mut inner = self.inner.lock().unwrap();
            let result = f(&mut inner);
            let snapshot: Vec<T> = inner.records.values().cloned().collect();
            let listeners: Vec<Listener<T>> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (result, snapshot, listeners)
        };
        for listener in &listeners {
            listener(&snapshot);
        }
        result
    }

    // ─── Point access ───────────────────────────────────────────────────────

    /// Look up a record by id. No side effects.
    pub fn get(&self, id: &str) -> Option<T> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    /// Snapshot of all records. Order is not meaningful.
    pub fn all(&self) -> Vec<T> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─── Mutation ───────────────────────────────────────────────────────────

    /// Insert or replace a record. Always notifies, even when the new value
    /// is identical to the old one; callers must not rely on
    /// change-detection suppression.
    pub fn set(&self, record: T) {
        self.mutate(|inner| {
            let key = record.id().to_string();
            inner.records.insert(key, record);
        });
    }

    /// Bulk upsert. Subscribers are notified exactly once, after all
    /// records are applied.
    pub fn set_many(&self, records: impl IntoIterator<Item = T>) {
        self.mutate(|inner| {
            for record in records {
                let key = record.id().to_string();
                inner.records.insert(key, record);
            }
        });
    }

    /// Remove a record. Notifies regardless of whether the key existed;
    /// returns the removed record if there was one.
    pub fn remove(&self, id: &str) -> Option<T> {
        self.mutate(|inner| inner.records.remove(id))
    }

    /// Keep only records matching the predicate. One notification for the
    /// whole sweep; returns how many records were removed.
    pub fn retain(&self, keep: impl Fn(&T) -> bool) -> usize {
        self.mutate(|inner| {
            let before = inner.records.len();
            inner.records.retain(|_, record| keep(record));
            before - inner.records.len()
        })
    }

    /// Remove all records. One notification.
    pub fn clear(&self) {
        self.mutate(|inner| inner.records.clear());
    }

    // ─── Read-side derivations ──────────────────────────────────────────────

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let inner = self.inner.lock().unwrap();
        inner
            .records
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        let inner = self.inner.lock().unwrap();
        inner.records.values().find(|record| predicate(record)).cloned()
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Vec<U> {
        let inner = self.inner.lock().unwrap();
        inner.records.values().map(f).collect()
    }

    /// Snapshot sorted by the given comparator.
    pub fn sorted_by(&self, cmp: impl FnMut(&T, &T) -> Ordering) -> Vec<T> {
        let mut records = self.all();
        records.sort_by(cmp);
        records
    }

    // ─── Subscriptions ──────────────────────────────────────────────────────

    /// Register a listener called with a full snapshot after every
    /// mutation. Registration itself does not notify.
    pub fn subscribe(&self, listener: impl Fn(&[T]) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap();
        let id = SubscriptionId::new(inner.next_subscription);
        inner.next_subscription += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Deregister a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sid, _)| *sid != id);
        inner.listeners.len() != before
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("EntityStore")
            .field("records", &inner.records.len())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: i32,
    }

    impl Item {
        fn new(id: &str, value: i32) -> Self {
            Self {
                id: id.to_string(),
                value,
            }
        }
    }

    impl Entity for Item {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn counting_listener(store: &EntityStore<Item>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        store.subscribe(move |_| {
            count_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });
        count
    }

    #[test]
    fn set_and_get() {
        let store = EntityStore::new();
        store.set(Item::new("a", 1));
        assert_eq!(store.get("a"), Some(Item::new("a", 1)));
        assert_eq!(store.get("missing"), None);
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn set_is_upsert() {
        let store = EntityStore::new();
        store.set(Item::new("a", 1));
        store.set(Item::new("a", 2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a"), Some(Item::new("a", 2)));
    }

    #[test]
    fn set_notifies_even_when_unchanged() {
        let store = EntityStore::new();
        let count = counting_listener(&store);
        store.set(Item::new("a", 1));
        store.set(Item::new("a", 1));
        assert_eq!(count.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn set_many_notifies_once() {
        let store = EntityStore::new();
        let count = counting_listener(&store);
        store.set_many(vec![Item::new("a", 1), Item::new("b", 2), Item::new("c", 3)]);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn remove_notifies_even_when_missing() {
        let store = EntityStore::new();
        let count = counting_listener(&store);
        assert_eq!(store.remove("ghost"), None);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn clear_notifies_once() {
        let store = EntityStore::new();
        store.set_many(vec![Item::new("a", 1), Item::new("b", 2)]);
        let count = counting_listener(&store);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn retain_notifies_once_and_counts() {
        let store = EntityStore::new();
        store.set_many(vec![Item::new("a", 1), Item::new("b", 2), Item::new("c", 1)]);
        let count = counting_listener(&store);
        let removed = store.retain(|item| item.value != 1);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn read_ops_do_not_notify() {
        let store = EntityStore::new();
        store.set_many(vec![Item::new("a", 3), Item::new("b", 1)]);
        let count = counting_listener(&store);

        let _ = store.get("a");
        let _ = store.all();
        let _ = store.contains("a");
        let _ = store.len();
        let _ = store.filter(|item| item.value > 1);
        let _ = store.find(|item| item.value == 1);
        let _ = store.map(|item| item.value);
        let _ = store.sorted_by(|a, b| a.value.cmp(&b.value));

        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn derivations() {
        let store = EntityStore::new();
        store.set_many(vec![Item::new("a", 3), Item::new("b", 1), Item::new("c", 2)]);

        assert_eq!(store.filter(|item| item.value >= 2).len(), 2);
        assert_eq!(store.find(|item| item.value == 1), Some(Item::new("b", 1)));
        assert!(store.find(|item| item.value == 99).is_none());

        let mut values = store.map(|item| item.value);
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);

        let sorted = store.sorted_by(|a, b| a.value.cmp(&b.value));
        assert_eq!(sorted[0].value, 1);
        assert_eq!(sorted[2].value, 3);
    }

    #[test]
    fn listener_receives_full_snapshot() {
        let store = EntityStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        store.subscribe(move |snapshot: &[Item]| {
            *seen_clone.lock().unwrap() = snapshot.to_vec();
        });

        store.set_many(vec![Item::new("a", 1), Item::new("b", 2)]);
        let mut ids: Vec<String> = seen.lock().unwrap().iter().map(|item| item.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = EntityStore::<Item>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let sub = store.subscribe(move |_| {
            count_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });

        store.set(Item::new("a", 1));
        assert!(store.unsubscribe(sub));
        store.set(Item::new("a", 2));

        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
        assert!(!store.unsubscribe(sub));
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let store = Arc::new(EntityStore::<Item>::new());
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let store_clone = Arc::clone(&store);
        let count_clone = Arc::clone(&count);
        let slot_clone = Arc::clone(&slot);
        let sub = store.subscribe(move |_| {
            count_clone.fetch_add(1, AtomicOrdering::SeqCst);
            if let Some(id) = slot_clone.lock().unwrap().take() {
                store_clone.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(sub);

        store.set(Item::new("a", 1));
        store.set(Item::new("a", 2));

        // first notification deregistered the listener, second never reached it
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn listener_may_mutate_store() {
        let store = Arc::new(EntityStore::<Item>::new());
        let store_clone = Arc::clone(&store);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        store.subscribe(move |snapshot: &[Item]| {
            // one-shot: react to the first record by inserting a derived one
            if fired_clone.fetch_add(1, AtomicOrdering::SeqCst) == 0 && !snapshot.is_empty() {
                store_clone.set(Item::new("derived", 99));
            }
        });

        store.set(Item::new("a", 1));
        assert!(store.contains("derived"));
    }
}
