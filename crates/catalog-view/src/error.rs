//! View engine error types.
//!
//! None of these are fatal: the engine keeps serving the last collection it
//! decoded. `user_message()` gives text suitable for a status bar.

use std::fmt;
use std::path::PathBuf;

use catalog_model::{CollectionKey, RecordId};
use thiserror::Error;

use crate::filter::FilterName;

/// Failure reported by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request (permissions, validation).
    #[error("store rejected the request: {0}")]
    Rejected(String),

    /// The subscription stream was shut down by the store.
    #[error("subscription closed by the store")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Delete,
    Update,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// A delete or update the store did not apply.
///
/// Nothing was changed locally before the request, so there is nothing to
/// roll back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to {kind} record {id}")]
pub struct MutationError {
    pub kind: MutationKind,
    pub id: RecordId,
    #[source]
    pub source: StoreError,
}

/// Configuration loading error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },

    #[error("page size must be at least 1 (found {0})")]
    InvalidPageSize(usize),
}

/// Error returned by [`ViewEngine`](crate::ViewEngine) operations.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("subscription to `{key}` failed")]
    Subscription {
        key: CollectionKey,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("no filter named `{0}` is registered")]
    UnknownFilter(FilterName),

    #[error("record {0} is not in the current collection")]
    UnknownRecord(RecordId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ViewError {
    /// Short message for display next to the table.
    pub fn user_message(&self) -> String {
        match self {
            Self::Subscription { .. } => {
                "Live updates are unavailable. Showing the last loaded data.".to_string()
            }
            Self::Mutation(err) => match err.kind {
                MutationKind::Delete => format!("Could not delete product {}.", err.id),
                MutationKind::Update => format!("Could not save changes to product {}.", err.id),
            },
            Self::UnknownFilter(name) => format!("Unknown filter '{name}'."),
            Self::UnknownRecord(id) => {
                format!("Product {id} is no longer in the catalog.")
            }
            Self::Config(err) => format!("Invalid view settings: {err}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;
