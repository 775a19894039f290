//! Data model for the product catalog view.
//!
//! - [`Record`] - one product as pushed by the store
//! - [`Collection`] - the decoded contents of the latest snapshot
//! - [`SortSpec`] - active column and direction
//! - [`FieldUpdate`] - a partial edit sent back to the store

pub mod display;
pub mod error;
pub mod ids;
pub mod record;
pub mod snapshot;
pub mod sort;
pub mod update;

pub use display::{MISSING_VALUE, format_last_updated, video_count_label};
pub use error::{ModelError, Result};
pub use ids::{CollectionKey, RecordId, RecordKey};
pub use record::{ContactStatus, Decoded, NO_LINK_SENTINEL, Record};
pub use snapshot::{
    Collection, DegradedField, DroppedRecord, KeyMismatch, RawSnapshot, SnapshotReport,
};
pub use sort::{SortColumn, SortDirection, SortSpec};
pub use update::{FieldUpdate, PartialFields};
