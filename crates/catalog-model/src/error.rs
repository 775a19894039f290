use thiserror::Error;

/// Reasons a pushed record, identifier or column name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("record has no identifier")]
    MissingIdentifier,
    #[error("invalid record identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("invalid collection key: {0:?}")]
    InvalidCollectionKey(String),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("record value is not an object")]
    NotAnObject,
    #[error("unknown sort column: {0}")]
    UnknownSortColumn(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
