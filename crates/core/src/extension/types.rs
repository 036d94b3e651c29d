//! Extension record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::Extension;

/// Annotation carrying the bucket object key of a linked attachment.
pub const OBJECT_KEY_ANNO: &str = "s3os.plugin.halo.run/object-key";

/// Annotation carrying the public URL of an externally stored attachment.
pub const EXTERNAL_LINK_ANNO: &str = "storage.halo.run/external-link";

/// Policy template name of S3-compatible storage backends.
pub const S3_TEMPLATE_NAME: &str = "s3os";

/// Metadata common to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Unique name within the record kind.
    pub name: String,
    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Set by the store on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Create metadata with a name and no annotations.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// A configured storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Record metadata.
    pub metadata: Metadata,
    /// Policy settings.
    pub spec: PolicySpec,
}

/// Policy settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// Human readable name.
    pub display_name: String,
    /// Storage kind the policy was created from.
    pub template_name: String,
    /// Config map holding the connection settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_name: Option<String>,
}

impl Policy {
    /// Whether this policy points at an S3-compatible backend.
    #[must_use]
    pub fn is_s3(&self) -> bool {
        self.spec.template_name == S3_TEMPLATE_NAME
    }
}

impl Extension for Policy {
    const KIND: &'static str = "Policy";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// A key/value settings blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    /// Record metadata.
    pub metadata: Metadata,
    /// Settings entries.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Extension for ConfigMap {
    const KIND: &'static str = "ConfigMap";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// A file known to the attachment catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Record metadata.
    pub metadata: Metadata,
    /// Attachment details.
    pub spec: AttachmentSpec,
}

/// Attachment details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpec {
    /// File name shown in the catalog.
    pub display_name: String,
    /// Storage policy the bytes live under.
    pub policy_name: String,
    /// User who registered the attachment.
    pub owner_name: String,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
}

impl Attachment {
    /// Object key this attachment was linked from, if any.
    #[must_use]
    pub fn object_key(&self) -> Option<&str> {
        self.metadata.annotation(OBJECT_KEY_ANNO)
    }

    /// Public URL of the linked bytes, if any.
    #[must_use]
    pub fn external_link(&self) -> Option<&str> {
        self.metadata.annotation(EXTERNAL_LINK_ANNO)
    }
}

impl Extension for Attachment {
    const KIND: &'static str = "Attachment";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
