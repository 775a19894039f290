//! The view-state engine.
//!
//! One [`ViewEngine`] serves one table view for the lifetime of one store
//! subscription. It owns the latest [`Collection`], the sort/filter/page
//! state and the derived, ordered row list, and recomputes that list
//! synchronously after every snapshot or intent.
//!
//! Edits and deletes are never applied locally: they go to the store as
//! [`MutationRequest`]s and become visible when the store pushes the next
//! snapshot.

use std::num::NonZeroUsize;
use std::sync::Arc;

use catalog_model::{
    Collection, CollectionKey, FieldUpdate, RawSnapshot, Record, RecordId, RecordKey,
    SnapshotReport, SortColumn, SortSpec,
};
use futures_util::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::compare::sort_records;
use crate::config::ViewConfig;
use crate::error::{MutationError, MutationKind, Result, StoreError, ViewError};
use crate::filter::{FilterName, FilterRegistry, FilterSpec, apply_filters};
use crate::logging::redact_value;
use crate::page::PageState;
use crate::store::{RecordStore, Subscription};

/// A pending delete or update. Resolves once the store has answered.
///
/// Holds its own handle to the store, so it can be awaited or spawned
/// independently of the engine.
pub type MutationRequest = BoxFuture<'static, std::result::Result<(), MutationError>>;

/// Health of the snapshot feed, shown to the user as a live/stale badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// Constructed; `attach` has not been called.
    Detached,
    /// Subscribed, waiting for the first snapshot.
    Connecting,
    /// The last snapshot was applied successfully.
    Live,
    /// The feed failed; the view shows the last collection it received.
    Stale { reason: String },
}

impl FeedStatus {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// What one turn of [`ViewEngine::next_snapshot`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Applied(SnapshotReport),
    /// The store pushed an error. The subscription stays open.
    Failed(StoreError),
    /// The stream ended and the subscription was released.
    Closed,
}

/// Toggle state of one registered filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub name: FilterName,
    pub label: String,
    pub enabled: bool,
}

/// Read-only summary of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    /// Identifiers of the rows on the current page, in display order.
    pub rows: Vec<RecordId>,
    pub total_records: usize,
    pub visible_records: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub sort: SortSpec,
    pub filters: Vec<FilterState>,
    pub feed: FeedStatus,
}

/// Synchronized, sorted, filtered and paged view over one store collection.
pub struct ViewEngine<S: RecordStore + 'static> {
    store: Arc<S>,
    key: CollectionKey,
    collection: Collection,
    registry: FilterRegistry,
    filters: FilterSpec,
    sort: SortSpec,
    page: PageState,
    derived: Vec<Arc<Record>>,
    feed: FeedStatus,
    subscription: Option<Subscription>,
}

impl<S: RecordStore + 'static> ViewEngine<S> {
    /// Create an engine with the built-in filters.
    pub fn new(store: Arc<S>, config: &ViewConfig) -> Result<Self> {
        Self::with_registry(store, config, FilterRegistry::builtin())
    }

    /// Create an engine with a custom filter registry.
    ///
    /// Every filter enabled in `config` must be registered.
    pub fn with_registry(
        store: Arc<S>,
        config: &ViewConfig,
        registry: FilterRegistry,
    ) -> Result<Self> {
        let page_size: NonZeroUsize = config.page_size()?;

        let mut filters = FilterSpec::new();
        for name in &config.enabled_filters {
            if !registry.contains(name) {
                return Err(ViewError::UnknownFilter(name.clone()));
            }
            filters.enable(name.clone());
        }

        Ok(Self {
            store,
            key: config.collection_key.clone(),
            collection: Collection::new(),
            registry,
            filters,
            sort: config.default_sort,
            page: PageState::new(page_size),
            derived: Vec::new(),
            feed: FeedStatus::Detached,
            subscription: None,
        })
    }

    // ------------------------------------------------------------------
    // Subscription lifecycle
    // ------------------------------------------------------------------

    /// Subscribe to the configured collection. Does nothing if already attached.
    pub fn attach(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            return Ok(());
        }

        match self.store.subscribe(&self.key) {
            Ok(subscription) => {
                info!(collection = %self.key, "subscribed to collection");
                self.subscription = Some(subscription);
                self.feed = FeedStatus::Connecting;
                Ok(())
            }
            Err(source) => {
                warn!(collection = %self.key, error = %source, "subscription failed");
                self.feed = FeedStatus::Stale {
                    reason: source.to_string(),
                };
                Err(ViewError::Subscription {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next push from the store and apply it.
    ///
    /// Returns [`FeedEvent::Closed`] immediately when not attached. Cancel
    /// safe, so it can sit in a `select!` next to the intent queue.
    pub async fn next_snapshot(&mut self) -> FeedEvent {
        let Some(subscription) = self.subscription.as_mut() else {
            return FeedEvent::Closed;
        };

        match subscription.next().await {
            Some(Ok(raw)) => FeedEvent::Applied(self.on_snapshot(&raw)),
            Some(Err(error)) => {
                warn!(collection = %self.key, %error, "snapshot feed reported an error");
                self.feed = FeedStatus::Stale {
                    reason: error.to_string(),
                };
                FeedEvent::Failed(error)
            }
            None => {
                warn!(collection = %self.key, "snapshot feed ended");
                self.release_subscription();
                self.feed = FeedStatus::Stale {
                    reason: StoreError::Closed.to_string(),
                };
                FeedEvent::Closed
            }
        }
    }

    /// Release the subscription and discard the view.
    pub fn teardown(mut self) {
        self.release_subscription();
        info!(collection = %self.key, "view torn down");
    }

    fn release_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            debug!(collection = %self.key, "unsubscribed");
        }
    }

    // ------------------------------------------------------------------
    // Snapshot reconciliation
    // ------------------------------------------------------------------

    /// Replace the collection with a freshly pushed snapshot.
    ///
    /// Records that fail to decode are logged and left out; the rest of the
    /// snapshot is applied. Sort, filter and page state are kept.
    pub fn on_snapshot(&mut self, raw: &RawSnapshot) -> SnapshotReport {
        let (collection, report) = Collection::from_snapshot(raw);

        for dropped in &report.dropped {
            warn!(key = %dropped.key, error = %dropped.error, "dropping malformed record");
        }
        for degraded in &report.degraded {
            warn!(key = %degraded.key, error = %degraded.error, "field unreadable; using fallback");
        }
        for id in &report.duplicates {
            warn!(%id, "record identifier appears more than once; keeping the last");
        }
        for mismatch in &report.key_mismatches {
            debug!(key = %mismatch.key, id = %mismatch.id, "record stored under a different key");
        }

        self.collection = collection;
        self.feed = FeedStatus::Live;
        self.recompute();

        info!(
            collection = %self.key,
            accepted = report.accepted,
            dropped = report.dropped.len(),
            visible = self.derived.len(),
            "applied snapshot"
        );
        report
    }

    /// Rebuild the derived row list from the collection, filters and sort.
    fn recompute(&mut self) {
        let mut rows = apply_filters(self.collection.iter(), &self.registry, &self.filters);
        sort_records(&mut rows, self.sort);
        self.derived = rows;

        debug!(
            total = self.collection.len(),
            visible = self.derived.len(),
            sort = %self.sort,
            "recomputed view"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            for record in self.page.slice(&self.derived) {
                trace!(id = %record.id, title = redact_value(&record.title), "row");
            }
        }
    }

    // ------------------------------------------------------------------
    // Local intents
    // ------------------------------------------------------------------

    /// Header click: flip the active column, or switch to `column` ascending.
    pub fn set_sort_column(&mut self, column: SortColumn) {
        self.sort = self.sort.select(column);
        debug!(sort = %self.sort, "sort changed");
        self.recompute();
    }

    /// Replace the sort specification outright.
    pub fn set_sort(&mut self, spec: SortSpec) {
        self.sort = spec;
        self.recompute();
    }

    /// Flip one filter toggle and return its new state.
    pub fn toggle_filter(&mut self, name: &FilterName) -> Result<bool> {
        if !self.registry.contains(name) {
            return Err(ViewError::UnknownFilter(name.clone()));
        }
        let enabled = self.filters.toggle(name);
        debug!(filter = %name, enabled, "filter toggled");
        self.recompute();
        Ok(enabled)
    }

    /// Jump to page `page` (1-based). Not clamped to the data.
    pub fn set_page(&mut self, page: usize) {
        self.page.set(page);
        debug!(page = self.page.current(), "page changed");
    }

    /// Advance one page if rows remain. Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next_page() {
            return false;
        }
        self.set_page(self.page.current() + 1);
        true
    }

    /// Go back one page unless on the first. Returns whether the page changed.
    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous_page() {
            return false;
        }
        self.set_page(self.page.current() - 1);
        true
    }

    // ------------------------------------------------------------------
    // Remote mutations
    // ------------------------------------------------------------------

    /// Store key for `id`: the key its record was pushed under, or the
    /// identifier itself for records not in the current collection.
    fn record_key(&self, id: &RecordId) -> RecordKey {
        self.collection
            .get(id)
            .map_or_else(|| RecordKey::from(id), |record| record.key.clone())
    }

    /// Ask the store to delete a record.
    ///
    /// The row stays visible until a snapshot without it arrives.
    pub fn request_delete(&self, id: &RecordId) -> MutationRequest {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let record = self.record_key(id);
        let id = id.clone();
        debug!(%id, %record, "requesting delete");

        Box::pin(async move {
            let result = store.delete(&key, &record).await;
            result.map_err(|source| {
                warn!(%id, error = %source, "delete rejected");
                MutationError {
                    kind: MutationKind::Delete,
                    id,
                    source,
                }
            })
        })
    }

    /// Ask the store to change one field of a record.
    pub fn request_field_update(&self, id: &RecordId, update: &FieldUpdate) -> MutationRequest {
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let record = self.record_key(id);
        let id = id.clone();
        let fields = update.to_partial_fields();
        debug!(%id, %record, field = update.field_name(), "requesting field update");

        Box::pin(async move {
            let result = store.update(&key, &record, fields).await;
            result.map_err(|source| {
                warn!(%id, error = %source, "update rejected");
                MutationError {
                    kind: MutationKind::Update,
                    id,
                    source,
                }
            })
        })
    }

    /// Request the next contact status for a record (unset and "No" both go
    /// to "Yes", "Yes" goes to "No").
    pub fn request_contact_toggle(&self, id: &RecordId) -> Result<MutationRequest> {
        let record = self
            .collection
            .get(id)
            .ok_or_else(|| ViewError::UnknownRecord(id.clone()))?;
        let next = record.contacted.toggled();
        debug!(
            %id,
            title = redact_value(&record.title),
            from = %record.contacted,
            to = %next,
            "toggling contact status"
        );
        Ok(self.request_field_update(id, &FieldUpdate::Contacted(next)))
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    /// Rows on the current page; empty when the page is past the end.
    pub fn current_page_slice(&self) -> &[Arc<Record>] {
        self.page.slice(&self.derived)
    }

    /// All rows that pass the filters, in display order.
    pub fn visible(&self) -> &[Arc<Record>] {
        &self.derived
    }

    /// Number of records in the latest snapshot.
    pub fn total_records(&self) -> usize {
        self.collection.len()
    }

    /// Number of records that pass the filters.
    pub fn visible_records(&self) -> usize {
        self.derived.len()
    }

    pub fn page(&self) -> usize {
        self.page.current()
    }

    pub fn page_size(&self) -> usize {
        self.page.size()
    }

    pub fn total_pages(&self) -> usize {
        self.page.total_pages(self.derived.len())
    }

    pub fn has_previous_page(&self) -> bool {
        self.page.has_previous()
    }

    pub fn has_next_page(&self) -> bool {
        self.page.has_next(self.derived.len())
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    /// Every registered filter with its toggle state, in registration order.
    pub fn filter_states(&self) -> Vec<FilterState> {
        self.registry
            .iter()
            .map(|filter| FilterState {
                name: filter.name.clone(),
                label: filter.label.clone(),
                enabled: self.filters.is_enabled(&filter.name),
            })
            .collect()
    }

    pub fn feed_status(&self) -> &FeedStatus {
        &self.feed
    }

    pub fn collection_key(&self) -> &CollectionKey {
        &self.key
    }

    /// Look up a record of the latest snapshot, visible or not.
    pub fn record(&self, id: &RecordId) -> Option<&Arc<Record>> {
        self.collection.get(id)
    }

    /// Snapshot of the derived state for rendering or serialization.
    pub fn view_state(&self) -> ViewState {
        ViewState {
            rows: self
                .current_page_slice()
                .iter()
                .map(|record| record.id.clone())
                .collect(),
            total_records: self.total_records(),
            visible_records: self.visible_records(),
            page: self.page(),
            page_size: self.page_size(),
            total_pages: self.total_pages(),
            has_previous_page: self.has_previous_page(),
            has_next_page: self.has_next_page(),
            sort: self.sort,
            filters: self.filter_states(),
            feed: self.feed.clone(),
        }
    }
}

impl<S: RecordStore + 'static> std::fmt::Debug for ViewEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewEngine")
            .field("key", &self.key)
            .field("records", &self.collection.len())
            .field("visible", &self.derived.len())
            .field("sort", &self.sort)
            .field("filters", &self.filters)
            .field("page", &self.page)
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}
