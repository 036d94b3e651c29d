//! Object storage access for S3-compatible backends using Apache OpenDAL.
//!
//! Connection settings are decoded per call from a policy's config map and
//! a fresh storage handle is built for every operation, then dropped.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ S3Properties  ──connect──▶  S3Storage (OpenDAL Operator)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ op.lister_with(prefix)     │ op.stat(key)                    │
//! │   .limit(n)                │   -> size, content type         │
//! │   .start_after(token)      │                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;

pub use config::{DELIMITER, S3Properties, encode_key};
pub use error::StorageError;
pub use service::{
    ListPage, ListPageRequest, ListedObject, ObjectMetadata, ObjectStorage, S3Connector,
    S3Storage, StorageConnector,
};
