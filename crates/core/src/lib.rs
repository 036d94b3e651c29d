//! Core logic for S3 Link.
//!
//! This crate contains the domain model and services with ZERO web or database
//! dependencies. Persistence and the caller identity are supplied by the
//! outer crates through traits.
//!
//! # Modules
//!
//! - `extension` - Typed records (policies, config maps, attachments) and the store trait
//! - `storage` - S3 connection settings, public URLs and object storage access
//! - `s3link` - Listing bucket objects and linking them as attachments

pub mod extension;
pub mod s3link;
pub mod storage;
