//! In-memory [`RecordStore`] with push-on-write subscriptions.
//!
//! Behaves like the hosted key-value store the catalog normally runs
//! against: every subscriber receives the full collection when it
//! subscribes and again after every successful write, and concurrent
//! writes resolve last-write-wins. Failures can be injected to exercise
//! the view's error paths.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use catalog_model::{CollectionKey, PartialFields, RawSnapshot, Record, RecordKey};
use catalog_view::{
    RecordStore, SnapshotPush, SnapshotSender, StoreError, StoreResult, Subscription,
};
use serde_json::Value;
use tracing::{debug, trace};

struct Subscriber {
    id: u64,
    key: CollectionKey,
    /// `None` once the stream has been closed from the store side.
    sender: Option<SnapshotSender>,
}

impl Subscriber {
    fn push(&self, push: SnapshotPush) {
        if let Some(sender) = &self.sender {
            // A closed receiver is about to unsubscribe.
            let _ = sender.send(push);
        }
    }
}

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionKey, RawSnapshot>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    unsubscribed: usize,
    failing_mutations: VecDeque<StoreError>,
    failing_subscribes: VecDeque<StoreError>,
}

impl Inner {
    fn collection_mut(&mut self, key: &CollectionKey) -> &mut RawSnapshot {
        self.collections.entry(key.clone()).or_default()
    }

    fn snapshot(&self, key: &CollectionKey) -> RawSnapshot {
        self.collections.get(key).cloned().unwrap_or_default()
    }

    /// Send the current collection to every subscriber of `key`.
    fn publish(&self, key: &CollectionKey) {
        let snapshot = self.snapshot(key);
        for subscriber in self.subscribers.iter().filter(|s| &s.key == key) {
            subscriber.push(Ok(snapshot.clone()));
        }
        trace!(collection = %key, records = snapshot.len(), "published snapshot");
    }
}

/// Shared in-memory store. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Store `record` under its key and notify subscribers.
    pub fn insert_record(&self, key: &CollectionKey, record: &Record) -> StoreResult<()> {
        let value = serde_json::to_value(record)
            .map_err(|e| StoreError::Rejected(format!("unserializable record: {e}")))?;
        self.insert_raw(key, record.key.as_str(), value)
    }

    /// Store an arbitrary JSON value under `record_key` and notify subscribers.
    pub fn insert_raw(&self, key: &CollectionKey, record_key: &str, value: Value) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner
            .collection_mut(key)
            .insert(record_key.to_string(), value);
        inner.publish(key);
        Ok(())
    }

    /// Replace a whole collection and notify subscribers.
    pub fn replace_collection(&self, key: &CollectionKey, snapshot: RawSnapshot) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.collections.insert(key.clone(), snapshot);
        inner.publish(key);
        Ok(())
    }

    /// Current contents of a collection.
    pub fn snapshot(&self, key: &CollectionKey) -> StoreResult<RawSnapshot> {
        Ok(self.lock()?.snapshot(key))
    }

    /// Make the next update or delete fail with `error`.
    pub fn fail_next_mutation(&self, error: StoreError) -> StoreResult<()> {
        self.lock()?.failing_mutations.push_back(error);
        Ok(())
    }

    /// Make the next subscribe call fail with `error`.
    pub fn fail_next_subscribe(&self, error: StoreError) -> StoreResult<()> {
        self.lock()?.failing_subscribes.push_back(error);
        Ok(())
    }

    /// Push an error to every subscriber of `key` without closing the stream.
    pub fn push_error(&self, key: &CollectionKey, error: &StoreError) -> StoreResult<()> {
        let inner = self.lock()?;
        for subscriber in inner.subscribers.iter().filter(|s| &s.key == key) {
            subscriber.push(Err(error.clone()));
        }
        Ok(())
    }

    /// End every subscription stream for `key`, as if the connection dropped.
    ///
    /// Subscribers are not counted as unsubscribed until they cancel.
    pub fn close_subscribers(&self, key: &CollectionKey) -> StoreResult<()> {
        let mut inner = self.lock()?;
        for subscriber in inner.subscribers.iter_mut().filter(|s| &s.key == key) {
            subscriber.sender = None;
        }
        Ok(())
    }

    /// Number of open subscriptions to `key`.
    pub fn subscriber_count(&self, key: &CollectionKey) -> usize {
        self.lock()
            .map(|inner| inner.subscribers.iter().filter(|s| &s.key == key).count())
            .unwrap_or(0)
    }

    /// Total number of subscriptions released so far.
    pub fn unsubscribe_count(&self) -> usize {
        self.lock().map(|inner| inner.unsubscribed).unwrap_or(0)
    }

    fn take_mutation_failure(inner: &mut Inner) -> StoreResult<()> {
        match inner.failing_mutations.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn subscribe(&self, key: &CollectionKey) -> StoreResult<Subscription> {
        let mut inner = self.lock()?;
        if let Some(error) = inner.failing_subscribes.pop_front() {
            return Err(error);
        }

        let id = inner.next_subscriber;
        inner.next_subscriber += 1;

        let registry = Arc::downgrade(&self.inner);
        let (sender, subscription) = Subscription::channel(key.clone(), move || {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            if let Ok(mut inner) = inner.lock() {
                inner.subscribers.retain(|s| s.id != id);
                inner.unsubscribed += 1;
            }
        });

        let _ = sender.send(Ok(inner.snapshot(key)));
        inner.subscribers.push(Subscriber {
            id,
            key: key.clone(),
            sender: Some(sender),
        });
        debug!(collection = %key, subscriber = id, "subscriber added");
        Ok(subscription)
    }

    async fn update(
        &self,
        key: &CollectionKey,
        record: &RecordKey,
        fields: PartialFields,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        Self::take_mutation_failure(&mut inner)?;

        let collection = inner.collection_mut(key);
        let entry = collection
            .entry(record.as_str().to_string())
            .or_insert_with(|| Value::Object(PartialFields::new()));
        let Value::Object(object) = entry else {
            return Err(StoreError::Rejected(format!("{record} is not an object")));
        };

        for (field, value) in fields {
            if value.is_null() {
                object.remove(&field);
            } else {
                object.insert(field, value);
            }
        }
        if object.is_empty() {
            collection.remove(record.as_str());
        }

        debug!(collection = %key, %record, "record updated");
        inner.publish(key);
        Ok(())
    }

    async fn delete(&self, key: &CollectionKey, record: &RecordKey) -> StoreResult<()> {
        let mut inner = self.lock()?;
        Self::take_mutation_failure(&mut inner)?;

        inner.collection_mut(key).remove(record.as_str());
        debug!(collection = %key, %record, "record deleted");
        inner.publish(key);
        Ok(())
    }
}
