//! Link service error types.

use s3link_shared::AppError;
use thiserror::Error;

use crate::extension::ExtensionError;
use crate::storage::StorageError;

/// Link service errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No authenticated caller.
    #[error("authentication required")]
    Unauthenticated,

    /// Storage policy does not exist.
    #[error("storage policy not found: {0}")]
    PolicyNotFound(String),

    /// Policy has no settings or they do not resolve.
    #[error("settings of storage policy {0} not found")]
    SettingsNotFound(String),

    /// Settings could not be decoded.
    #[error("invalid storage settings: {0}")]
    InvalidSettings(String),

    /// Object does not exist in the bucket.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Storage backend rejected the request or could not be reached.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Request is malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Extension store failed.
    #[error("extension store error: {0}")]
    Store(#[from] ExtensionError),
}

impl LinkError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StorageError> for LinkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::ObjectNotFound(key),
            StorageError::Configuration(msg) => Self::InvalidSettings(msg),
            StorageError::Operation(msg) => Self::BackendUnavailable(msg),
        }
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        let message = err.to_string();
        match err {
            LinkError::Unauthenticated => Self::Unauthorized(message),
            LinkError::PolicyNotFound(_)
            | LinkError::SettingsNotFound(_)
            | LinkError::ObjectNotFound(_) => Self::NotFound(message),
            LinkError::InvalidSettings(_) | LinkError::Validation(_) => Self::Validation(message),
            LinkError::BackendUnavailable(_) => Self::ExternalService(message),
            LinkError::Store(ExtensionError::AlreadyExists { .. }) => Self::Conflict(message),
            LinkError::Store(_) => Self::Database(message),
        }
    }
}
