//! Typed extension records and the generic store they live in.
//!
//! Policies, config maps and attachments are all stored through the same
//! `fetch` / `list` / `create` interface, keyed by record kind and name.

mod error;
mod store;
mod types;

pub use error::ExtensionError;
pub use store::{Extension, ExtensionStore};
pub use types::{
    Attachment, AttachmentSpec, ConfigMap, EXTERNAL_LINK_ANNO, Metadata, OBJECT_KEY_ANNO, Policy,
    PolicySpec, S3_TEMPLATE_NAME,
};
