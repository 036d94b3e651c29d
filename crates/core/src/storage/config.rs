//! S3 connection settings decoded from a policy's config map.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use crate::extension::ConfigMap;

/// Path delimiter of bucket keys.
pub const DELIMITER: char = '/';

/// Config map entry holding the settings JSON.
const SETTINGS_ENTRY: &str = "default";

/// Characters kept verbatim in a key path segment (RFC 3986 `pchar`).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Connection properties of an S3-compatible backend.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Properties {
    /// Endpoint host, without scheme.
    #[serde(default)]
    pub endpoint: String,
    /// Scheme of public URLs.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Scheme used to reach the endpoint; falls back to `protocol`.
    #[serde(default)]
    pub endpoint_protocol: Option<String>,
    /// Bucket region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Key prefix objects are listed under.
    #[serde(default)]
    pub location: Option<String>,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub access_secret: String,
    /// Address the bucket as `{endpoint}/{bucket}` instead of `{bucket}.{endpoint}`.
    #[serde(default)]
    pub enable_path_style_access: bool,
    /// Custom domain serving the bucket publicly.
    #[serde(default)]
    pub domain: Option<String>,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

impl std::fmt::Debug for S3Properties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Properties")
            .field("endpoint", &self.endpoint)
            .field("protocol", &self.protocol)
            .field("endpoint_protocol", &self.endpoint_protocol)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("location", &self.location)
            .field("access_key", &self.access_key)
            .field("access_secret", &"[hidden]")
            .field("enable_path_style_access", &self.enable_path_style_access)
            .field("domain", &self.domain)
            .finish()
    }
}

impl S3Properties {
    /// Decode properties from the `default` entry of a config map.
    ///
    /// A missing entry decodes as an empty object and then fails validation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the JSON is malformed or a
    /// required field is blank.
    pub fn from_config_map(config_map: &ConfigMap) -> Result<Self, StorageError> {
        let json = config_map
            .data
            .get(SETTINGS_ENTRY)
            .map_or("{}", String::as_str);
        Self::from_json(json)
    }

    /// Decode and validate properties from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the JSON is malformed or a
    /// required field is blank.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let properties: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::configuration(format!("malformed settings: {e}")))?;
        properties.validate()?;
        Ok(properties)
    }

    fn validate(&self) -> Result<(), StorageError> {
        if self.endpoint.trim().is_empty() {
            return Err(StorageError::configuration("endpoint is required"));
        }
        if self.bucket.trim().is_empty() {
            return Err(StorageError::configuration("bucket is required"));
        }
        for scheme in [Some(self.protocol.as_str()), self.endpoint_protocol.as_deref()]
            .into_iter()
            .flatten()
        {
            if scheme != "http" && scheme != "https" {
                return Err(StorageError::configuration(format!(
                    "unsupported protocol '{scheme}'"
                )));
            }
        }
        Ok(())
    }

    /// Scheme used to reach the endpoint.
    #[must_use]
    pub fn endpoint_scheme(&self) -> &str {
        self.endpoint_protocol
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.protocol)
    }

    /// Endpoint URL handed to the S3 client.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.endpoint_scheme(), self.endpoint.trim())
    }

    /// Directory listed for this backend: `{location}/`, or the bucket root.
    #[must_use]
    pub fn list_path(&self) -> String {
        match self
            .location
            .as_deref()
            .map(|l| l.trim_matches(DELIMITER))
            .filter(|l| !l.is_empty())
        {
            Some(location) => format!("{location}{DELIMITER}"),
            None => DELIMITER.to_string(),
        }
    }

    /// Public URL of an object.
    ///
    /// The host is the custom domain when set, otherwise `{endpoint}/{bucket}`
    /// for path-style access or `{bucket}.{endpoint}` for virtual-hosted style.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        let host = match self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => domain.to_string(),
            None if self.enable_path_style_access => {
                format!("{}/{}", self.endpoint.trim(), self.bucket)
            }
            None => format!("{}.{}", self.bucket, self.endpoint.trim()),
        };
        format!("{}://{}/{}", self.protocol, host, encode_key(key))
    }
}

/// Percent-encode a key for use as a URL path, keeping `/` separators.
#[must_use]
pub fn encode_key(key: &str) -> String {
    key.split(DELIMITER)
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
