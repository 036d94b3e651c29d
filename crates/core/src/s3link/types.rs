//! Link service types and data structures.

use serde::{Deserialize, Serialize};

use s3link_shared::types::{CursorPage, CursorRequest};

use crate::storage::ListedObject;

/// Authenticated identity performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User name recorded as attachment owner.
    pub name: String,
}

impl Caller {
    /// Create a caller from a user name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One bucket object in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time as reported by the backend.
    pub last_modified: Option<String>,
    /// Entity tag.
    #[serde(rename = "eTag")]
    pub etag: Option<String>,
    /// Whether an attachment of the same policy already links this key.
    pub is_linked: bool,
}

impl From<ListedObject> for ObjectEntry {
    fn from(object: ListedObject) -> Self {
        Self {
            key: object.key,
            size: object.size,
            last_modified: object.last_modified,
            etag: object.etag,
            is_linked: false,
        }
    }
}

/// Page of bucket objects.
pub type ObjectPage = CursorPage<ObjectEntry>;

/// Query for one page of bucket objects.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsQuery {
    /// Cursor and page size.
    pub cursor: CursorRequest,
    /// Only return objects that are not linked yet.
    pub unlinked: bool,
}

/// Request to link objects of one policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    /// Storage policy the objects belong to.
    pub policy_name: String,
    /// Keys to link.
    pub object_keys: Vec<String>,
}

/// Result of linking a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOutcome {
    /// Object key.
    pub object_key: String,
    /// Whether an attachment was created.
    pub success: bool,
    /// Failure description.
    pub message: Option<String>,
}

impl LinkOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn linked(object_key: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            success: true,
            message: None,
        }
    }

    /// Failed outcome.
    #[must_use]
    pub fn failed(object_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Outcomes of a link batch, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkResult {
    /// One outcome per requested key.
    pub items: Vec<LinkOutcome>,
}

impl LinkResult {
    /// Number of keys linked successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.success).count()
    }
}
