//! Live, sortable, filterable and paginated view over a product collection
//! held in a push-based remote store.
//!
//! # Architecture
//!
//! - `store` - the [`RecordStore`] capability and cancelable [`Subscription`]
//! - `compare` - record ordering for the active [`SortSpec`](catalog_model::SortSpec)
//! - `filter` - named predicates ([`FilterRegistry`]) and the filter pipeline
//! - `page` - [`PageState`] slicing
//! - `engine` - [`ViewEngine`], tying the above to snapshots and user intents
//! - `config` - [`ViewConfig`] loaded from TOML
//! - `logging` - `tracing-subscriber` setup for host applications
//!
//! # Example
//!
//! ```ignore
//! let mut view = ViewEngine::new(store, &ViewConfig::default())?;
//! view.attach()?;
//!
//! loop {
//!     tokio::select! {
//!         event = view.next_snapshot() => render(&view.view_state()),
//!         Some(intent) = intents.recv() => handle(&mut view, intent),
//!     }
//! }
//! ```

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod logging;
pub mod page;
pub mod store;

pub use compare::{compare, sort_records};
pub use config::ViewConfig;
pub use engine::{FeedEvent, FeedStatus, FilterState, MutationRequest, ViewEngine, ViewState};
pub use error::{ConfigError, MutationError, MutationKind, Result, StoreError, ViewError};
pub use filter::{FilterDef, FilterName, FilterRegistry, FilterSpec, Predicate, apply_filters};
pub use logging::{LogConfig, LogFormat, init_logging, init_logging_with_writer};
pub use page::{DEFAULT_PAGE_SIZE, PageState};
pub use store::{RecordStore, SnapshotPush, SnapshotSender, StoreResult, Subscription};
