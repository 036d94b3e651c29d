//! Object storage access implemented with Apache OpenDAL.

use std::time::Duration;

use futures::TryStreamExt;
use opendal::layers::TimeoutLayer;
use opendal::{Operator, services};

use super::config::S3Properties;
use super::error::StorageError;

/// Request for one page of a delimiter-mode listing.
#[derive(Debug, Clone)]
pub struct ListPageRequest {
    /// Directory to list, `/`-terminated.
    pub prefix: String,
    /// Maximum number of entries returned.
    pub page_size: usize,
    /// Resume after this key.
    pub start_after: Option<String>,
}

/// One entry of a listing. Sub-directories appear as `/`-terminated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time as reported by the backend.
    pub last_modified: Option<String>,
    /// Entity tag.
    pub etag: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries in backend order.
    pub objects: Vec<ListedObject>,
    /// Key to resume after when more entries exist.
    pub next_token: Option<String>,
    /// Whether the listing was truncated.
    pub has_more: bool,
}

/// Metadata returned by a head request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Content type, if the backend reports one.
    pub content_type: Option<String>,
}

/// Operations consumed from an S3-compatible backend.
pub trait ObjectStorage: Send + Sync {
    /// List one page of objects under a prefix without descending into sub-directories.
    fn list_page(
        &self,
        request: ListPageRequest,
    ) -> impl std::future::Future<Output = Result<ListPage, StorageError>> + Send;

    /// Fetch a single object's metadata.
    fn stat(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<ObjectMetadata, StorageError>> + Send;
}

/// Builds a storage handle from connection properties.
///
/// Handles are built per operation and dropped when it completes.
pub trait StorageConnector: Send + Sync {
    /// Storage handle type.
    type Storage: ObjectStorage;

    /// Build a handle for the given backend.
    fn connect(&self, properties: &S3Properties) -> Result<Self::Storage, StorageError>;
}

/// Connector producing OpenDAL-backed S3 handles.
#[derive(Debug, Clone)]
pub struct S3Connector {
    timeout: Duration,
}

impl S3Connector {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a connector applying `timeout` to every backend request.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for S3Connector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl StorageConnector for S3Connector {
    type Storage = S3Storage;

    fn connect(&self, properties: &S3Properties) -> Result<S3Storage, StorageError> {
        let mut builder = services::S3::default()
            .endpoint(&properties.endpoint_url())
            .bucket(&properties.bucket)
            .region(&properties.region)
            .access_key_id(&properties.access_key)
            .secret_access_key(&properties.access_secret)
            .root("/")
            // Credentials come from the policy only.
            .disable_config_load()
            .disable_ec2_metadata();

        if !properties.enable_path_style_access {
            builder = builder.enable_virtual_host_style();
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .layer(TimeoutLayer::new().with_timeout(self.timeout))
            .finish();

        Ok(S3Storage { operator })
    }
}

/// S3 bucket handle.
#[derive(Debug, Clone)]
pub struct S3Storage {
    operator: Operator,
}

impl ObjectStorage for S3Storage {
    async fn list_page(&self, request: ListPageRequest) -> Result<ListPage, StorageError> {
        let page_size = request.page_size.max(1);

        let mut lister = self.operator.lister_with(&request.prefix).limit(page_size);
        if let Some(start_after) = request.start_after.as_deref() {
            lister = lister.start_after(start_after);
        }
        let mut lister = lister.await.map_err(StorageError::from)?;

        // One look-ahead entry tells whether the listing is truncated.
        let mut objects = Vec::with_capacity(page_size + 1);
        while objects.len() <= page_size {
            let Some(entry) = lister.try_next().await.map_err(StorageError::from)? else {
                break;
            };
            let meta = entry.metadata();
            objects.push(ListedObject {
                key: entry.path().to_string(),
                size: meta.content_length(),
                last_modified: meta.last_modified().map(|t| t.to_string()),
                etag: meta.etag().map(String::from),
            });
        }

        let has_more = objects.len() > page_size;
        objects.truncate(page_size);
        let next_token = if has_more {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_token,
            has_more,
        })
    }

    async fn stat(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| StorageError::for_key(&e, key))?;

        Ok(ObjectMetadata {
            size: meta.content_length(),
            content_type: meta.content_type().map(String::from),
        })
    }
}
