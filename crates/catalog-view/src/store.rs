//! The remote record store capability the engine consumes.
//!
//! The store pushes the *whole* collection on every change; there are no
//! diffs. Writes are acknowledged asynchronously and show up in the view
//! only through the next pushed snapshot.

use async_trait::async_trait;
use catalog_model::{CollectionKey, PartialFields, RawSnapshot, RecordKey};
use tokio::sync::mpsc;

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One item of a subscription stream.
pub type SnapshotPush = StoreResult<RawSnapshot>;

/// Sending half handed to the store when a subscription is opened.
pub type SnapshotSender = mpsc::UnboundedSender<SnapshotPush>;

/// Push-based key-value store holding product collections.
///
/// Implementations must be Send + Sync; mutation futures outlive the
/// borrow of the engine that issued them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a live subscription to a collection.
    ///
    /// The store should push the current contents right away and again after
    /// every change.
    fn subscribe(&self, key: &CollectionKey) -> StoreResult<Subscription>;

    /// Merge `fields` into the record stored under `record`. A `null` value
    /// removes that field.
    async fn update(
        &self,
        key: &CollectionKey,
        record: &RecordKey,
        fields: PartialFields,
    ) -> StoreResult<()>;

    /// Remove the record stored under `record` from the collection.
    async fn delete(&self, key: &CollectionKey, record: &RecordKey) -> StoreResult<()>;
}

type CancelHook = Box<dyn FnOnce() + Send>;

/// A cancelable stream of full-collection snapshots.
///
/// The cancel hook runs exactly once: on the first call to
/// [`cancel`](Self::cancel) or when the subscription is dropped.
pub struct Subscription {
    key: CollectionKey,
    pushes: mpsc::UnboundedReceiver<SnapshotPush>,
    cancel: Option<CancelHook>,
}

impl Subscription {
    pub fn new(
        key: CollectionKey,
        pushes: mpsc::UnboundedReceiver<SnapshotPush>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            key,
            pushes,
            cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Create a subscription together with the sender the store pushes into.
    pub fn channel(
        key: CollectionKey,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> (SnapshotSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(key, rx, on_cancel))
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Wait for the next push. `None` once the stream has ended or the
    /// subscription was canceled.
    ///
    /// Cancel safe: dropping the future never loses a push.
    pub async fn next(&mut self) -> Option<SnapshotPush> {
        if self.cancel.is_none() {
            return None;
        }
        self.pushes.recv().await
    }

    /// Release the subscription. Later calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(hook) = self.cancel.take() {
            self.pushes.close();
            hook();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_subscription() -> (SnapshotSender, Subscription, Arc<AtomicUsize>) {
        let cancels = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&cancels);
        let (tx, sub) = Subscription::channel(CollectionKey::default(), move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        (tx, sub, cancels)
    }

    #[test]
    fn cancel_runs_hook_once() {
        let (_tx, mut sub, cancels) = counting_subscription();
        sub.cancel();
        sub.cancel();
        drop(sub);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_runs_hook() {
        let (_tx, sub, cancels) = counting_subscription();
        assert!(sub.is_active());
        drop(sub);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn canceled_subscription_yields_nothing() {
        let (tx, mut sub, _) = counting_subscription();
        tx.send(Ok(RawSnapshot::new())).unwrap();
        sub.cancel();
        assert!(sub.next().await.is_none());
        assert!(tx.send(Ok(RawSnapshot::new())).is_err());
    }

    #[tokio::test]
    async fn pushes_arrive_in_order() {
        let (tx, mut sub, _) = counting_subscription();
        for i in 0..3 {
            let mut raw = RawSnapshot::new();
            raw.insert("n".to_string(), serde_json::json!(i));
            tx.send(Ok(raw)).unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(Ok(raw)) = sub.next().await {
            seen.push(raw["n"].as_i64().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
