//! Link service implementation.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use s3link_shared::config::StorageSettings;

use super::error::LinkError;
use super::types::{Caller, LinkOutcome, LinkRequest, LinkResult, ListObjectsQuery, ObjectEntry, ObjectPage};
use crate::extension::{
    Attachment, AttachmentSpec, ConfigMap, EXTERNAL_LINK_ANNO, ExtensionStore, Metadata,
    OBJECT_KEY_ANNO, Policy,
};
use crate::storage::{
    DELIMITER, ListPageRequest, ObjectMetadata, ObjectStorage, S3Properties, StorageConnector,
    StorageError,
};

/// Service listing bucket objects and linking them as attachments.
pub struct S3LinkService<R: ExtensionStore, C: StorageConnector> {
    store: Arc<R>,
    connector: Arc<C>,
    settings: StorageSettings,
}

impl<R: ExtensionStore, C: StorageConnector> S3LinkService<R, C> {
    /// Create a new link service.
    #[must_use]
    pub fn new(store: Arc<R>, connector: Arc<C>, settings: StorageSettings) -> Self {
        Self {
            store,
            connector,
            settings,
        }
    }

    /// List storage policies backed by S3-compatible buckets.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension store fails.
    pub async fn list_policies(&self) -> Result<Vec<Policy>, LinkError> {
        Ok(self.store.list::<Policy, _>(Policy::is_s3).await?)
    }

    /// List one page of objects of a policy's bucket.
    ///
    /// Directory markers are skipped and every entry is flagged with whether an
    /// attachment of the same policy already links its key. The page keeps the
    /// backend's ordering.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The page size is zero
    /// - The policy or its settings cannot be resolved
    /// - The storage backend call fails
    /// - The extension store fails
    pub async fn list_objects(
        &self,
        policy_name: &str,
        query: ListObjectsQuery,
    ) -> Result<ObjectPage, LinkError> {
        let page_size = query
            .cursor
            .effective_page_size(self.settings.default_page_size, self.settings.max_page_size)
            .ok_or_else(|| LinkError::validation("page size must be greater than zero"))?;

        let properties = self.resolve_properties(policy_name).await?;
        let current_token = query.cursor.token().map(String::from);

        let page = {
            let storage = self.connector.connect(&properties).map_err(listing_error)?;
            storage
                .list_page(ListPageRequest {
                    prefix: properties.list_path(),
                    page_size: usize::try_from(page_size).unwrap_or(usize::MAX),
                    start_after: current_token.clone(),
                })
                .await
                .map_err(listing_error)?
        };

        let mut entries: Vec<ObjectEntry> = page
            .objects
            .into_iter()
            .filter(|object| !object.key.ends_with(DELIMITER))
            .map(ObjectEntry::from)
            .collect();

        if !entries.is_empty() {
            let linked = self.linked_keys(policy_name).await?;
            for entry in &mut entries {
                entry.is_linked = linked.contains(&entry.key);
            }
        }

        if query.unlinked {
            entries.retain(|entry| !entry.is_linked);
        }

        debug!(
            policy = %policy_name,
            count = entries.len(),
            has_more = page.has_more,
            "Listed bucket objects"
        );

        Ok(ObjectPage {
            objects: entries,
            current_token,
            next_token: page.next_token,
            has_more: page.has_more,
        })
    }

    /// Link a batch of objects as attachments owned by the caller.
    ///
    /// Keys are processed one after another and independently: a failing key
    /// is reported in its outcome and does not affect the others.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Unauthenticated` if there is no caller. No key is
    /// processed in that case.
    pub async fn link_objects(
        &self,
        caller: Option<&Caller>,
        request: LinkRequest,
    ) -> Result<LinkResult, LinkError> {
        let caller = caller
            .filter(|caller| !caller.name.is_empty())
            .ok_or(LinkError::Unauthenticated)?;

        let mut items = Vec::with_capacity(request.object_keys.len());
        for object_key in &request.object_keys {
            items.push(
                self.link_object(caller, &request.policy_name, object_key)
                    .await,
            );
        }

        let result = LinkResult { items };
        info!(
            policy = %request.policy_name,
            owner = %caller.name,
            requested = result.items.len(),
            linked = result.succeeded(),
            "Linked bucket objects"
        );
        Ok(result)
    }

    /// Link a single object, capturing any failure in the outcome.
    pub async fn link_object(
        &self,
        caller: &Caller,
        policy_name: &str,
        object_key: &str,
    ) -> LinkOutcome {
        match self.create_link(caller, policy_name, object_key).await {
            Ok(attachment) => {
                debug!(
                    policy = %policy_name,
                    key = %object_key,
                    attachment = %attachment.metadata.name,
                    "Object linked"
                );
                LinkOutcome::linked(object_key)
            }
            Err(e) => {
                warn!(policy = %policy_name, key = %object_key, error = %e, "Failed to link object");
                LinkOutcome::failed(object_key, outcome_message(&e))
            }
        }
    }

    async fn create_link(
        &self,
        caller: &Caller,
        policy_name: &str,
        object_key: &str,
    ) -> Result<Attachment, LinkError> {
        if object_key.is_empty() || object_key.ends_with(DELIMITER) {
            return Err(LinkError::validation(format!(
                "'{object_key}' is not an object key"
            )));
        }

        let properties = self.resolve_properties(policy_name).await?;

        // Existence check doubles as the source of size and content type.
        let metadata = {
            let storage = self.connector.connect(&properties)?;
            storage.stat(object_key).await?
        };

        let attachment = build_attachment(&properties, caller, policy_name, object_key, metadata);
        Ok(self.store.create(attachment).await?)
    }

    async fn resolve_properties(&self, policy_name: &str) -> Result<S3Properties, LinkError> {
        let policy = self
            .store
            .fetch::<Policy>(policy_name)
            .await?
            .ok_or_else(|| LinkError::PolicyNotFound(policy_name.to_string()))?;

        if !policy.is_s3() {
            return Err(LinkError::validation(format!(
                "storage policy {policy_name} is not an S3 policy"
            )));
        }

        let config_map_name = policy
            .spec
            .config_map_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LinkError::SettingsNotFound(policy_name.to_string()))?;

        let config_map = self
            .store
            .fetch::<ConfigMap>(config_map_name)
            .await?
            .ok_or_else(|| LinkError::SettingsNotFound(policy_name.to_string()))?;

        Ok(S3Properties::from_config_map(&config_map)?)
    }

    async fn linked_keys(&self, policy_name: &str) -> Result<HashSet<String>, LinkError> {
        let attachments = self
            .store
            .list::<Attachment, _>(|attachment| attachment.spec.policy_name == policy_name)
            .await?;

        Ok(attachments
            .iter()
            .filter_map(Attachment::object_key)
            .map(String::from)
            .collect())
    }
}

/// Message reported to the caller for a failed key. Store details stay in the log.
fn outcome_message(err: &LinkError) -> String {
    match err {
        LinkError::Store(_) => STORE_FAILURE_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

const STORE_FAILURE_MESSAGE: &str = "An error occurred";

/// Listing failures are backend failures, except for bad settings.
fn listing_error(err: StorageError) -> LinkError {
    match err {
        StorageError::Configuration(msg) => LinkError::InvalidSettings(msg),
        StorageError::Operation(msg) => LinkError::BackendUnavailable(msg),
        other => LinkError::BackendUnavailable(other.to_string()),
    }
}

fn build_attachment(
    properties: &S3Properties,
    caller: &Caller,
    policy_name: &str,
    object_key: &str,
    metadata: ObjectMetadata,
) -> Attachment {
    let mut meta = Metadata::named(Uuid::new_v4().to_string());
    meta.annotations
        .insert(OBJECT_KEY_ANNO.to_string(), object_key.to_string());
    meta.annotations.insert(
        EXTERNAL_LINK_ANNO.to_string(),
        properties.public_url(object_key),
    );

    let display_name = object_key.rsplit(DELIMITER).next().unwrap_or(object_key);

    Attachment {
        metadata: meta,
        spec: AttachmentSpec {
            display_name: display_name.to_string(),
            policy_name: policy_name.to_string(),
            owner_name: caller.name.clone(),
            media_type: metadata.content_type,
            size: metadata.size,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Extension, ExtensionError, PolicySpec};
    use crate::storage::{ListPage, ListedObject};
    use s3link_shared::types::CursorRequest;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock extension store for testing.
    #[derive(Default)]
    struct MockExtensionStore {
        records: Mutex<BTreeMap<(String, String), serde_json::Value>>,
        fail_writes: AtomicBool,
    }

    impl MockExtensionStore {
        fn insert<E: Extension>(&self, extension: &E) {
            self.records.lock().unwrap().insert(
                (E::KIND.to_string(), extension.name().to_string()),
                serde_json::to_value(extension).unwrap(),
            );
        }

        fn all<E: Extension>(&self) -> Vec<E> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|((kind, _), _)| kind == E::KIND)
                .map(|(_, value)| serde_json::from_value(value.clone()).unwrap())
                .collect()
        }
    }

    impl ExtensionStore for MockExtensionStore {
        async fn fetch<E: Extension>(&self, name: &str) -> Result<Option<E>, ExtensionError> {
            self.records
                .lock()
                .unwrap()
                .get(&(E::KIND.to_string(), name.to_string()))
                .map(|value| {
                    serde_json::from_value(value.clone())
                        .map_err(|e| ExtensionError::serialization(E::KIND, &e))
                })
                .transpose()
        }

        async fn list<E, P>(&self, predicate: P) -> Result<Vec<E>, ExtensionError>
        where
            E: Extension,
            P: Fn(&E) -> bool + Send + Sync,
        {
            Ok(self.all::<E>().into_iter().filter(|e| predicate(e)).collect())
        }

        async fn create<E: Extension>(&self, extension: E) -> Result<E, ExtensionError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ExtensionError::repository("connection reset by peer"));
            }
            let key = (E::KIND.to_string(), extension.name().to_string());
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&key) {
                return Err(ExtensionError::AlreadyExists {
                    kind: E::KIND,
                    name: key.1,
                });
            }
            records.insert(key, serde_json::to_value(&extension).unwrap());
            Ok(extension)
        }
    }

    /// In-memory bucket answering like a delimiter-mode S3 listing.
    #[derive(Default)]
    struct FakeConnector {
        objects: BTreeMap<String, ObjectMetadata>,
        unavailable: bool,
        connects: AtomicUsize,
        live: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn with_keys(keys: &[&str]) -> Self {
            Self {
                objects: keys
                    .iter()
                    .map(|key| {
                        (
                            (*key).to_string(),
                            ObjectMetadata {
                                size: 1024,
                                content_type: Some("image/png".to_string()),
                            },
                        )
                    })
                    .collect(),
                ..Self::default()
            }
        }
    }

    struct FakeStorage {
        objects: BTreeMap<String, ObjectMetadata>,
        unavailable: bool,
        live: Arc<AtomicUsize>,
    }

    impl Drop for FakeStorage {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl StorageConnector for FakeConnector {
        type Storage = FakeStorage;

        fn connect(&self, _properties: &S3Properties) -> Result<FakeStorage, StorageError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(FakeStorage {
                objects: self.objects.clone(),
                unavailable: self.unavailable,
                live: Arc::clone(&self.live),
            })
        }
    }

    impl ObjectStorage for FakeStorage {
        async fn list_page(&self, request: ListPageRequest) -> Result<ListPage, StorageError> {
            if self.unavailable {
                return Err(StorageError::operation("connection refused"));
            }
            let prefix = request.prefix.trim_start_matches('/');

            let mut entries: BTreeMap<String, ListedObject> = BTreeMap::new();
            for (key, meta) in &self.objects {
                let Some(rest) = key.strip_prefix(prefix) else {
                    continue;
                };
                let (entry_key, size) = match rest.find('/') {
                    Some(pos) => (format!("{prefix}{}", &rest[..=pos]), 0),
                    None => (key.clone(), meta.size),
                };
                entries
                    .entry(entry_key.clone())
                    .or_insert(ListedObject {
                        key: entry_key,
                        size,
                        last_modified: None,
                        etag: None,
                    });
            }

            let start_after = request.start_after.unwrap_or_default();
            let mut objects: Vec<ListedObject> = entries
                .into_values()
                .filter(|o| o.key > start_after)
                .take(request.page_size + 1)
                .collect();
            let has_more = objects.len() > request.page_size;
            objects.truncate(request.page_size);
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
            if self.unavailable {
                return Err(StorageError::operation("connection refused"));
            }
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::not_found(key))
        }
    }

    const SETTINGS: &str = r#"{"protocol": "https", "domain": "", "bucket": "b",
        "endpoint": "s3.example.com", "enablePathStyleAccess": true}"#;

    fn s3_policy(name: &str, config_map: &str) -> Policy {
        Policy {
            metadata: Metadata::named(name),
            spec: PolicySpec {
                display_name: name.to_uppercase(),
                template_name: "s3os".to_string(),
                config_map_name: Some(config_map.to_string()),
            },
        }
    }

    fn config_map(name: &str, settings: &str) -> ConfigMap {
        ConfigMap {
            metadata: Metadata::named(name),
            data: BTreeMap::from([("default".to_string(), settings.to_string())]),
        }
    }

    fn linked_attachment(name: &str, policy: &str, key: &str) -> Attachment {
        let mut metadata = Metadata::named(name);
        metadata
            .annotations
            .insert(OBJECT_KEY_ANNO.to_string(), key.to_string());
        Attachment {
            metadata,
            spec: AttachmentSpec {
                display_name: key.to_string(),
                policy_name: policy.to_string(),
                owner_name: "admin".to_string(),
                media_type: None,
                size: 1,
            },
        }
    }

    fn service_with(
        connector: FakeConnector,
        settings: &str,
    ) -> (
        S3LinkService<MockExtensionStore, FakeConnector>,
        Arc<MockExtensionStore>,
        Arc<FakeConnector>,
    ) {
        let store = Arc::new(MockExtensionStore::default());
        store.insert(&s3_policy("minio", "minio-cm"));
        store.insert(&config_map("minio-cm", settings));
        let connector = Arc::new(connector);
        let service = S3LinkService::new(
            Arc::clone(&store),
            Arc::clone(&connector),
            StorageSettings::default(),
        );
        (service, store, connector)
    }

    fn service(
        keys: &[&str],
    ) -> (
        S3LinkService<MockExtensionStore, FakeConnector>,
        Arc<MockExtensionStore>,
        Arc<FakeConnector>,
    ) {
        service_with(FakeConnector::with_keys(keys), SETTINGS)
    }

    fn page_query(token: Option<&str>, page_size: Option<u32>) -> ListObjectsQuery {
        ListObjectsQuery {
            cursor: CursorRequest {
                continuation_token: token.map(String::from),
                page_size,
            },
            unlinked: false,
        }
    }

    fn keys(page: &ObjectPage) -> Vec<&str> {
        page.objects.iter().map(|o| o.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_policies_only_s3() {
        let (service, store, _) = service(&[]);
        store.insert(&Policy {
            metadata: Metadata::named("local"),
            spec: PolicySpec {
                display_name: "Local".to_string(),
                template_name: "local".to_string(),
                config_map_name: None,
            },
        });

        let policies = service.list_policies().await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].metadata.name, "minio");
    }

    #[tokio::test]
    async fn test_list_empty_bucket() {
        let (service, _, _) = service(&[]);

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        assert!(page.objects.is_empty());
        assert!(!page.has_more);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_skips_directory_markers() {
        let (service, _, _) = service(&["a.png", "dir/", "dir/x.png", "z.txt"]);

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        assert_eq!(keys(&page), vec!["a.png", "z.txt"]);
    }

    #[tokio::test]
    async fn test_list_under_location() {
        let (service, _, _) = service_with(
            FakeConnector::with_keys(&["root.png", "uploads/a.png", "uploads/b.png"]),
            r#"{"bucket": "b", "endpoint": "s3.example.com", "location": "uploads"}"#,
        );

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        assert_eq!(keys(&page), vec!["uploads/a.png", "uploads/b.png"]);
    }

    #[tokio::test]
    async fn test_is_linked_without_records() {
        let (service, _, _) = service(&["a.png", "b.png"]);

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        assert!(page.objects.iter().all(|o| !o.is_linked));
    }

    #[tokio::test]
    async fn test_is_linked_with_one_record() {
        let (service, store, _) = service(&["a.png", "b.png"]);
        store.insert(&linked_attachment("att-1", "minio", "b.png"));

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        let linked: Vec<(&str, bool)> = page
            .objects
            .iter()
            .map(|o| (o.key.as_str(), o.is_linked))
            .collect();
        assert_eq!(linked, vec![("a.png", false), ("b.png", true)]);
    }

    #[tokio::test]
    async fn test_is_linked_with_many_records() {
        let (service, store, _) = service(&["a.png", "b.png", "c.png"]);
        store.insert(&linked_attachment("att-1", "minio", "a.png"));
        store.insert(&linked_attachment("att-2", "minio", "c.png"));
        // Keys that are not listed, and links of another policy, are ignored.
        store.insert(&linked_attachment("att-3", "minio", "gone.png"));
        store.insert(&linked_attachment("att-4", "other", "b.png"));

        let page = service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();

        let linked: Vec<bool> = page.objects.iter().map(|o| o.is_linked).collect();
        assert_eq!(linked, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_list_unlinked_only() {
        let (service, store, _) = service(&["a.png", "b.png", "c.png"]);
        store.insert(&linked_attachment("att-1", "minio", "b.png"));

        let page = service
            .list_objects(
                "minio",
                ListObjectsQuery {
                    unlinked: true,
                    ..ListObjectsQuery::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(keys(&page), vec!["a.png", "c.png"]);
    }

    #[tokio::test]
    async fn test_list_exactly_full_page() {
        let (service, _, _) = service(&["a", "b", "c"]);

        let page = service
            .list_objects("minio", page_query(None, Some(3)))
            .await
            .unwrap();

        assert_eq!(keys(&page), vec!["a", "b", "c"]);
        assert!(!page.has_more);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_link_store_failure_message_is_generic() {
        let (service, store, _) = service(&["k1"]);
        store.fail_writes.store(true, Ordering::SeqCst);

        let outcome = service
            .link_object(&Caller::new("editor"), "minio", "k1")
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("An error occurred"));
        assert!(store.all::<Attachment>().is_empty());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (service, _, _) = service(&["a", "b", "c", "d", "e"]);

        let first = service
            .list_objects("minio", page_query(None, Some(2)))
            .await
            .unwrap();
        assert_eq!(keys(&first), vec!["a", "b"]);
        assert!(first.has_more);
        assert_eq!(first.next_token.as_deref(), Some("b"));
        assert!(first.current_token.is_none());

        let second = service
            .list_objects("minio", page_query(first.next_token.as_deref(), Some(2)))
            .await
            .unwrap();
        assert_eq!(keys(&second), vec!["c", "d"]);
        assert_eq!(second.current_token.as_deref(), Some("b"));

        let last = service
            .list_objects("minio", page_query(second.next_token.as_deref(), Some(2)))
            .await
            .unwrap();
        assert_eq!(keys(&last), vec!["e"]);
        assert!(!last.has_more);
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_zero_page_size_rejected() {
        let (service, _, connector) = service(&["a"]);

        let result = service.list_objects("minio", page_query(None, Some(0))).await;

        assert!(matches!(result, Err(LinkError::Validation(_))));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_policy_not_found() {
        let (service, _, _) = service(&[]);

        let result = service
            .list_objects("missing", ListObjectsQuery::default())
            .await;

        assert!(matches!(result, Err(LinkError::PolicyNotFound(ref name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_list_settings_not_found() {
        let (service, store, _) = service(&[]);
        store.insert(&s3_policy("dangling", "no-such-cm"));

        let result = service
            .list_objects("dangling", ListObjectsQuery::default())
            .await;

        assert!(matches!(result, Err(LinkError::SettingsNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_invalid_settings() {
        let (service, _, _) = service_with(FakeConnector::default(), "{not json");

        let result = service
            .list_objects("minio", ListObjectsQuery::default())
            .await;

        assert!(matches!(result, Err(LinkError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn test_list_backend_unavailable() {
        let connector = FakeConnector {
            unavailable: true,
            ..FakeConnector::with_keys(&["a.png"])
        };
        let (service, _, connector) = service_with(connector, SETTINGS);

        let result = service
            .list_objects("minio", ListObjectsQuery::default())
            .await;

        assert!(matches!(result, Err(LinkError::BackendUnavailable(_))));
        assert_eq!(connector.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_partial_failure() {
        let (service, store, _) = service(&["img/k1.png"]);
        let caller = Caller::new("editor");

        let result = service
            .link_objects(
                Some(&caller),
                LinkRequest {
                    policy_name: "minio".to_string(),
                    object_keys: vec!["img/k1.png".to_string(), "img/k2.png".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(
            result.items,
            vec![
                LinkOutcome::linked("img/k1.png"),
                LinkOutcome::failed("img/k2.png", "object not found: img/k2.png"),
            ]
        );

        let attachments = store.all::<Attachment>();
        assert_eq!(attachments.len(), 1);
        let attachment = &attachments[0];
        assert_eq!(attachment.object_key(), Some("img/k1.png"));
        assert_eq!(
            attachment.external_link(),
            Some("https://s3.example.com/b/img/k1.png")
        );
        assert_eq!(attachment.spec.owner_name, "editor");
        assert_eq!(attachment.spec.policy_name, "minio");
        assert_eq!(attachment.spec.display_name, "k1.png");
        assert_eq!(attachment.spec.media_type.as_deref(), Some("image/png"));
        assert_eq!(attachment.spec.size, 1024);
        assert!(Uuid::parse_str(&attachment.metadata.name).is_ok());
    }

    #[tokio::test]
    async fn test_link_failure_first_does_not_block_later_keys() {
        let (service, store, _) = service(&["k1"]);
        let caller = Caller::new("editor");

        let result = service
            .link_objects(
                Some(&caller),
                LinkRequest {
                    policy_name: "minio".to_string(),
                    object_keys: vec!["k2".to_string(), "k1".to_string()],
                },
            )
            .await
            .unwrap();

        assert!(!result.items[0].success);
        assert!(result.items[1].success);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(store.all::<Attachment>().len(), 1);
    }

    #[tokio::test]
    async fn test_link_requires_caller() {
        let (service, store, connector) = service(&["k1"]);

        let result = service
            .link_objects(
                None,
                LinkRequest {
                    policy_name: "minio".to_string(),
                    object_keys: vec!["k1".to_string()],
                },
            )
            .await;

        assert!(matches!(result, Err(LinkError::Unauthenticated)));
        assert!(store.all::<Attachment>().is_empty());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_unknown_policy_reported_per_key() {
        let (service, _, _) = service(&["k1"]);
        let caller = Caller::new("editor");

        let result = service
            .link_objects(
                Some(&caller),
                LinkRequest {
                    policy_name: "missing".to_string(),
                    object_keys: vec!["k1".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(
            result.items,
            vec![LinkOutcome::failed(
                "k1",
                "storage policy not found: missing"
            )]
        );
    }

    #[tokio::test]
    async fn test_link_directory_key_rejected() {
        let (service, store, _) = service(&["dir/"]);
        let outcome = service
            .link_object(&Caller::new("editor"), "minio", "dir/")
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("not an object key"));
        assert!(store.all::<Attachment>().is_empty());
    }

    #[tokio::test]
    async fn test_link_backend_unavailable_captured() {
        let connector = FakeConnector {
            unavailable: true,
            ..FakeConnector::with_keys(&["k1"])
        };
        let (service, _, _) = service_with(connector, SETTINGS);

        let outcome = service
            .link_object(&Caller::new("editor"), "minio", "k1")
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.message.as_deref(),
            Some("storage backend unavailable: connection refused")
        );
    }

    #[tokio::test]
    async fn test_link_same_key_twice_creates_two_records() {
        let (service, store, _) = service(&["k1"]);
        let caller = Caller::new("editor");

        for _ in 0..2 {
            assert!(service.link_object(&caller, "minio", "k1").await.success);
        }

        assert_eq!(store.all::<Attachment>().len(), 2);
    }

    #[tokio::test]
    async fn test_storage_handles_released() {
        let (service, _, connector) = service(&["k1"]);
        let caller = Caller::new("editor");

        service
            .list_objects("minio", ListObjectsQuery::default())
            .await
            .unwrap();
        service.link_object(&caller, "minio", "k1").await;
        service.link_object(&caller, "minio", "missing").await;

        assert_eq!(connector.connects.load(Ordering::SeqCst), 3);
        assert_eq!(connector.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_link_custom_domain_url() {
        let (service, store, _) = service_with(
            FakeConnector::with_keys(&["a/b c.png"]),
            r#"{"bucket": "b", "endpoint": "s3.example.com", "domain": "cdn.example.com"}"#,
        );

        let outcome = service
            .link_object(&Caller::new("editor"), "minio", "a/b c.png")
            .await;
        assert!(outcome.success);

        let attachments = store.all::<Attachment>();
        assert_eq!(
            attachments[0].external_link(),
            Some("https://cdn.example.com/a/b%20c.png")
        );
    }

    // Listings never expose directory markers, whatever the bucket holds.
    proptest::proptest! {
        #[test]
        fn prop_listing_has_no_directory_markers(
            bucket in proptest::collection::btree_set("[a-c]{1,2}(/[a-c]{0,2}){0,2}", 0..20),
            page_size in 1u32..8,
        ) {
            let bucket: Vec<&str> = bucket.iter().map(String::as_str).collect();
            let (service, _, _) = service(&bucket);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            let mut token: Option<String> = None;
            loop {
                let page = runtime
                    .block_on(service.list_objects("minio", page_query(token.as_deref(), Some(page_size))))
                    .unwrap();
                for entry in &page.objects {
                    proptest::prop_assert!(!entry.key.ends_with('/'), "directory marker listed: {}", entry.key);
                }
                if !page.has_more {
                    break;
                }
                token = page.next_token;
            }
        }
    }
}
