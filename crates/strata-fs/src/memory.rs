//! In-memory providers backed by a fixture document.
//!
//! Used by the CLI to browse a described world and by tests as the provider
//! behind the projection. Object listings honour delimiter queries with the
//! same semantics as hosted object stores: keys come back in lexicographic
//! order and prefixes are deduplicated.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strata_core::{ProviderError, ResourceKind, Timestamp};
use thiserror::Error;

use crate::hierarchy::group_items;
use crate::provider::{
    BucketAttrs, ListFilter, ListItem, ObjectAttrs, ObjectQuery, ObjectStore, RawResource,
    ResourceProvider,
};

/// Errors loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid fixture document
    #[error("Invalid fixture: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A described world of containers, volumes and buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Container runtime contents
    pub runtime: RuntimeFixture,
    /// Object store contents
    pub storage: StorageFixture,
}

/// Container runtime contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeFixture {
    /// Provider name
    pub name: String,
    /// Containers
    pub containers: Vec<ContainerFixture>,
    /// Volumes
    pub volumes: Vec<VolumeFixture>,
}

impl Default for RuntimeFixture {
    fn default() -> Self {
        Self {
            name: "docker".to_string(),
            containers: Vec::new(),
            volumes: Vec::new(),
        }
    }
}

/// One container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerFixture {
    /// Container ID
    pub id: String,
    /// Image reference
    pub image: Option<String>,
    /// Creation time
    pub created: Option<Timestamp>,
    /// Log output
    pub logs: String,
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// One volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeFixture {
    /// Volume name
    pub name: String,
    /// Volume driver
    pub driver: Option<String>,
    /// Stored files by path
    pub files: BTreeMap<String, String>,
}

/// Object store contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageFixture {
    /// Provider name
    pub name: String,
    /// Buckets
    pub buckets: Vec<BucketFixture>,
}

impl Default for StorageFixture {
    fn default() -> Self {
        Self {
            name: "storage".to_string(),
            buckets: Vec::new(),
        }
    }
}

/// One bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketFixture {
    /// Bucket name
    pub name: String,
    /// Creation time
    pub created: Option<Timestamp>,
    /// Location constraint
    pub location: Option<String>,
    /// Objects by key
    pub objects: BTreeMap<String, String>,
}

impl Fixture {
    /// Parses a fixture from TOML.
    pub fn from_toml(content: &str) -> Result<Self, FixtureError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a fixture from a TOML file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Builds the providers described by the fixture.
    pub fn into_providers(self) -> (MemoryRuntime, MemoryStore) {
        (
            MemoryRuntime::new(self.runtime),
            MemoryStore::new(self.storage),
        )
    }
}

/// In-memory container runtime.
#[derive(Debug)]
pub struct MemoryRuntime {
    name: String,
    containers: RwLock<Vec<ContainerFixture>>,
    volumes: RwLock<Vec<VolumeFixture>>,
}

impl MemoryRuntime {
    /// Creates a runtime from its fixture.
    pub fn new(fixture: RuntimeFixture) -> Self {
        Self {
            name: fixture.name,
            containers: RwLock::new(fixture.containers),
            volumes: RwLock::new(fixture.volumes),
        }
    }

    /// Adds a container.
    pub fn add_container(&self, container: ContainerFixture) {
        self.containers.write().push(container);
    }

    /// Removes a container. Returns true if it existed.
    pub fn remove_container(&self, id: &str) -> bool {
        let mut containers = self.containers.write();
        let before = containers.len();
        containers.retain(|c| c.id != id);
        containers.len() != before
    }

    /// Appends log output to a container.
    pub fn append_logs(&self, id: &str, output: &str) -> bool {
        match self.containers.write().iter_mut().find(|c| c.id == id) {
            Some(container) => {
                container.logs.push_str(output);
                true
            }
            None => false,
        }
    }

    fn container_document(container: &ContainerFixture) -> Value {
        json!({
            "Id": container.id,
            "Image": container.image,
            "Created": container.created,
            "Labels": container.labels,
        })
    }

    fn volume_document(volume: &VolumeFixture) -> Value {
        json!({
            "Name": volume.name,
            "Driver": volume.driver.as_deref().unwrap_or("local"),
            "Mountpoint": format!("/var/lib/docker/volumes/{}/_data", volume.name),
        })
    }

    fn volume_files(&self, volume: &str) -> Result<BTreeMap<String, String>, ProviderError> {
        self.volumes
            .read()
            .iter()
            .find(|v| v.name == volume)
            .map(|v| v.files.clone())
            .ok_or_else(|| ProviderError::NotFound(format!("volume {volume}")))
    }
}

#[async_trait]
impl ResourceProvider for MemoryRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<Vec<RawResource>, ProviderError> {
        let resources = match kind {
            ResourceKind::Container => self
                .containers
                .read()
                .iter()
                .filter(|c| {
                    filter
                        .labels
                        .iter()
                        .all(|(k, v)| c.labels.get(k) == Some(v))
                })
                .map(|c| RawResource {
                    id: c.id.clone(),
                    created: c.created,
                    document: Self::container_document(c),
                })
                .collect(),
            ResourceKind::Volume => self
                .volumes
                .read()
                .iter()
                .map(|v| RawResource {
                    id: v.name.clone(),
                    created: None,
                    document: Self::volume_document(v),
                })
                .collect(),
        };
        Ok(resources)
    }

    async fn inspect(&self, kind: ResourceKind, id: &str) -> Result<Value, ProviderError> {
        let document = match kind {
            ResourceKind::Container => self
                .containers
                .read()
                .iter()
                .find(|c| c.id == id)
                .map(Self::container_document),
            ResourceKind::Volume => self
                .volumes
                .read()
                .iter()
                .find(|v| v.name == id)
                .map(Self::volume_document),
        };
        document.ok_or_else(|| ProviderError::NotFound(format!("{kind} {id}")))
    }

    async fn read_content(&self, kind: ResourceKind, id: &str) -> Result<Bytes, ProviderError> {
        match kind {
            ResourceKind::Container => self
                .containers
                .read()
                .iter()
                .find(|c| c.id == id)
                .map(|c| Bytes::from(c.logs.clone()))
                .ok_or_else(|| ProviderError::NotFound(format!("container {id}"))),
            ResourceKind::Volume => Err(ProviderError::Other(format!(
                "volume {id} has no readable content"
            ))),
        }
    }

    async fn list_volume_objects(&self, volume: &str) -> Result<Vec<ObjectAttrs>, ProviderError> {
        Ok(self
            .volume_files(volume)?
            .into_iter()
            .map(|(path, content)| ObjectAttrs {
                name: path,
                size: content.len() as u64,
                ..Default::default()
            })
            .collect())
    }

    async fn read_volume_object(&self, volume: &str, key: &str) -> Result<Bytes, ProviderError> {
        self.volume_files(volume)?
            .remove(key)
            .map(Bytes::from)
            .ok_or_else(|| ProviderError::NotFound(format!("{volume}:{key}")))
    }
}

/// A stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    attrs: ObjectAttrs,
    data: Bytes,
}

/// A stored bucket.
#[derive(Debug, Clone)]
struct StoredBucket {
    attrs: BucketAttrs,
    objects: BTreeMap<String, StoredObject>,
}

/// In-memory object store.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    delimiter_queries: bool,
    buckets: RwLock<BTreeMap<String, StoredBucket>>,
}

impl MemoryStore {
    /// Creates a store from its fixture.
    pub fn new(fixture: StorageFixture) -> Self {
        let now = Timestamp::now();
        let buckets = fixture
            .buckets
            .into_iter()
            .map(|bucket| {
                let created = bucket.created.unwrap_or(now);
                let objects = bucket
                    .objects
                    .into_iter()
                    .map(|(key, content)| {
                        let object = StoredObject {
                            attrs: ObjectAttrs {
                                name: key.clone(),
                                size: content.len() as u64,
                                created: Some(created),
                                updated: Some(created),
                                content_type: None,
                            },
                            data: Bytes::from(content),
                        };
                        (key, object)
                    })
                    .collect();
                let attrs = BucketAttrs {
                    name: bucket.name.clone(),
                    created: Some(created),
                    location: bucket.location,
                    storage_class: None,
                };
                (bucket.name, StoredBucket { attrs, objects })
            })
            .collect();

        Self {
            name: fixture.name,
            delimiter_queries: true,
            buckets: RwLock::new(buckets),
        }
    }

    /// Creates an empty store named `name`.
    pub fn empty(name: &str) -> Self {
        Self::new(StorageFixture {
            name: name.to_string(),
            buckets: Vec::new(),
        })
    }

    /// Disables delimiter-aware queries, forcing local grouping.
    pub fn without_delimiter_queries(mut self) -> Self {
        self.delimiter_queries = false;
        self
    }

    /// Creates an empty bucket if it does not exist.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_insert_with(|| StoredBucket {
                attrs: BucketAttrs {
                    name: bucket.to_string(),
                    created: Some(Timestamp::now()),
                    ..Default::default()
                },
                objects: BTreeMap::new(),
            });
    }

    /// Stores an object, creating the bucket if needed.
    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.create_bucket(bucket);
        let data = data.into();
        let now = Timestamp::now();
        let mut buckets = self.buckets.write();
        if let Some(stored) = buckets.get_mut(bucket) {
            let created = stored
                .objects
                .get(key)
                .and_then(|o| o.attrs.created)
                .unwrap_or(now);
            stored.objects.insert(
                key.to_string(),
                StoredObject {
                    attrs: ObjectAttrs {
                        name: key.to_string(),
                        size: data.len() as u64,
                        created: Some(created),
                        updated: Some(now),
                        content_type: None,
                    },
                    data,
                },
            );
        }
    }

    /// Returns every key of a bucket in lexicographic order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true if the bucket exists.
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().contains_key(bucket)
    }

    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&StoredBucket) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let buckets = self.buckets.read();
        let stored = buckets
            .get(bucket)
            .ok_or_else(|| ProviderError::NotFound(format!("bucket {bucket}")))?;
        f(stored)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_delimiter(&self) -> bool {
        self.delimiter_queries
    }

    async fn list_buckets(&self) -> Result<Vec<BucketAttrs>, ProviderError> {
        Ok(self
            .buckets
            .read()
            .values()
            .map(|b| b.attrs.clone())
            .collect())
    }

    async fn bucket_attrs(&self, bucket: &str) -> Result<BucketAttrs, ProviderError> {
        self.with_bucket(bucket, |b| Ok(b.attrs.clone()))
    }

    async fn bucket_size(&self, bucket: &str) -> Result<Option<u64>, ProviderError> {
        self.with_bucket(bucket, |b| {
            Ok(Some(b.objects.values().map(|o| o.attrs.size).sum()))
        })
    }

    async fn object_attrs(&self, bucket: &str, key: &str) -> Result<ObjectAttrs, ProviderError> {
        self.with_bucket(bucket, |b| {
            b.objects
                .get(key)
                .map(|o| o.attrs.clone())
                .ok_or_else(|| ProviderError::NotFound(format!("{bucket}/{key}")))
        })
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError> {
        self.with_bucket(bucket, |b| {
            b.objects
                .get(key)
                .map(|o| o.data.clone())
                .ok_or_else(|| ProviderError::NotFound(format!("{bucket}/{key}")))
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        query: &ObjectQuery,
    ) -> Result<Vec<ListItem>, ProviderError> {
        let flat: Vec<ListItem> = self.with_bucket(bucket, |b| {
            Ok(b.objects
                .range(query.prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&query.prefix))
                .map(|(_, o)| ListItem::Object(o.attrs.clone()))
                .collect())
        })?;

        Ok(match &query.delimiter {
            Some(delimiter) if self.delimiter_queries => {
                group_items(flat, &query.prefix, delimiter)
            }
            _ => flat,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        let mut buckets = self.buckets.write();
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| ProviderError::NotFound(format!("bucket {bucket}")))?;
        stored
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(format!("{bucket}/{key}")))
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        let mut buckets = self.buckets.write();
        match buckets.get(bucket) {
            None => Err(ProviderError::NotFound(format!("bucket {bucket}"))),
            Some(stored) if !stored.objects.is_empty() => Err(ProviderError::Other(format!(
                "bucket {bucket} is not empty"
            ))),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
[runtime]
name = "docker"

[[runtime.containers]]
id = "abc123"
image = "nginx:latest"
logs = "started\n"

[[runtime.volumes]]
name = "data"
[runtime.volumes.files]
"etc/app.conf" = "port = 80"

[[storage.buckets]]
name = "photos"
created = 1700000000000
[storage.buckets.objects]
"a/b" = "1"
"a/c" = "2"
"d" = "3"
"#;

    #[test]
    fn test_fixture_parse() {
        let fixture = Fixture::from_toml(FIXTURE).unwrap();
        assert_eq!(fixture.runtime.containers[0].id, "abc123");
        assert_eq!(fixture.storage.name, "storage");
        assert_eq!(fixture.storage.buckets[0].created, Some(Timestamp::new(1700000000000)));
    }

    #[tokio::test]
    async fn test_grouped_listing() {
        let (_, store) = Fixture::from_toml(FIXTURE).unwrap().into_providers();

        let items = store
            .list_objects("photos", &ObjectQuery::grouped("", "/"))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ListItem::Prefix("a/".into()));
        assert!(matches!(&items[1], ListItem::Object(o) if o.name == "d"));

        let flat = store
            .list_objects("photos", &ObjectQuery::flat("a/"))
            .await
            .unwrap();
        assert_eq!(flat.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_bucket_requires_empty() {
        let store = MemoryStore::empty("storage");
        store.put_object("b", "k", "v");

        assert!(store.delete_bucket("b").await.is_err());
        store.delete_object("b", "k").await.unwrap();
        store.delete_bucket("b").await.unwrap();
        assert!(!store.has_bucket("b"));
    }

    #[tokio::test]
    async fn test_runtime_listing() {
        let (runtime, _) = Fixture::from_toml(FIXTURE).unwrap().into_providers();

        let containers = runtime
            .list_all(ResourceKind::Container, &ListFilter::default())
            .await
            .unwrap();
        assert_eq!(containers[0].id, "abc123");
        assert_eq!(containers[0].document["Image"], "nginx:latest");

        let logs = runtime
            .read_content(ResourceKind::Container, "abc123")
            .await
            .unwrap();
        assert_eq!(logs, Bytes::from_static(b"started\n"));

        let filtered = runtime
            .list_all(
                ResourceKind::Container,
                &ListFilter {
                    labels: vec![("app".into(), "web".into())],
                },
            )
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }
}
