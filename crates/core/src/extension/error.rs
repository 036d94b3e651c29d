//! Extension store error types.

use thiserror::Error;

/// Extension store operation errors.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// A record with the same kind and name already exists.
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Record kind.
        kind: &'static str,
        /// Record name.
        name: String,
    },

    /// Stored document could not be converted to or from its record type.
    #[error("failed to (de)serialize {kind}: {message}")]
    Serialization {
        /// Record kind.
        kind: &'static str,
        /// Underlying serde message.
        message: String,
    },

    /// Backing store failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ExtensionError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Create a serialization error for a record kind.
    #[must_use]
    pub fn serialization(kind: &'static str, err: &serde_json::Error) -> Self {
        Self::Serialization {
            kind,
            message: err.to_string(),
        }
    }
}
