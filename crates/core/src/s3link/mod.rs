//! Browsing bucket objects and linking them into the attachment catalog.
//!
//! This module provides:
//! - Listing storage policies backed by S3-compatible buckets
//! - Paged object listings flagged with their link state
//! - Batch linking of objects as external-link attachments

mod error;
mod service;
mod types;

pub use error::LinkError;
pub use service::S3LinkService;
pub use types::{
    Caller, LinkOutcome, LinkRequest, LinkResult, ListObjectsQuery, ObjectEntry, ObjectPage,
};
