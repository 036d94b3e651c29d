//! Extension store trait.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ExtensionError;
use super::types::Metadata;

/// A record kind that can be kept in an [`ExtensionStore`].
pub trait Extension: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind discriminator, unique per record type.
    const KIND: &'static str;

    /// Returns the record metadata.
    fn metadata(&self) -> &Metadata;

    /// Returns the mutable record metadata.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Returns the record name.
    fn name(&self) -> &str {
        &self.metadata().name
    }
}

/// Generic record store.
///
/// This trait is implemented by the db crate to provide actual persistence.
pub trait ExtensionStore: Send + Sync {
    /// Fetch a record by name.
    fn fetch<E: Extension>(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<E>, ExtensionError>> + Send;

    /// List all records of a kind accepted by the predicate.
    fn list<E, P>(
        &self,
        predicate: P,
    ) -> impl std::future::Future<Output = Result<Vec<E>, ExtensionError>> + Send
    where
        E: Extension,
        P: Fn(&E) -> bool + Send + Sync;

    /// Create a new record. Fails if the name is already taken for this kind.
    fn create<E: Extension>(
        &self,
        extension: E,
    ) -> impl std::future::Future<Output = Result<E, ExtensionError>> + Send;
}
