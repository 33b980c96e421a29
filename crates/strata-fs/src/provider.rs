//! Provider client seams.
//!
//! The projection engine talks to external systems only through these two
//! traits. SDK adapters implement them; errors are reported as
//! [`ProviderError`] and passed through the core unchanged.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_core::{Attributes, ProviderError, ResourceKind, Timestamp};
use tracing::warn;

/// One resource as returned by a provider listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource {
    /// Identifier unique within its kind (container ID, volume name)
    pub id: String,
    /// Creation time, when the provider reports one
    pub created: Option<Timestamp>,
    /// Raw provider document describing the resource
    pub document: Value,
}

/// Filter applied to a provider listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Label equality constraints
    pub labels: Vec<(String, String)>,
}

/// Attributes of one stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAttrs {
    /// Full object key
    pub name: String,
    /// Content size in bytes
    pub size: u64,
    /// Creation time
    pub created: Option<Timestamp>,
    /// Last update time
    pub updated: Option<Timestamp>,
    /// Content type, if recorded
    pub content_type: Option<String>,
}

impl ObjectAttrs {
    /// Projects the object attributes onto entry attributes.
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new().with_size(self.size);
        attrs.crtime = self.created;
        attrs.ctime = self.updated.or(self.created);
        attrs.mtime = self.updated.or(self.created);
        match serde_json::to_value(self) {
            Ok(meta) => attrs = attrs.with_meta(meta),
            Err(err) => warn!(key = %self.name, error = %err, "Unable to encode object attributes"),
        }
        attrs
    }
}

/// Attributes of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAttrs {
    /// Bucket name
    pub name: String,
    /// Creation time
    pub created: Option<Timestamp>,
    /// Location constraint
    pub location: Option<String>,
    /// Default storage class
    pub storage_class: Option<String>,
}

/// One item of an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    /// A stored object
    Object(ObjectAttrs),
    /// A shared key prefix, ending with the delimiter
    Prefix(String),
}

/// Object listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    /// Only keys starting with this prefix are returned
    pub prefix: String,
    /// When set, keys are grouped at the first delimiter after the prefix
    pub delimiter: Option<String>,
}

impl ObjectQuery {
    /// Query for the keys directly under `prefix`.
    pub fn grouped(prefix: &str, delimiter: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            delimiter: Some(delimiter.to_string()),
        }
    }

    /// Query for every key under `prefix`, ignoring hierarchy.
    pub fn flat(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            delimiter: None,
        }
    }
}

/// Client of a container runtime (containers, volumes).
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Returns the provider name used as the root directory.
    fn name(&self) -> &str;

    /// Lists every resource of a kind.
    async fn list_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<Vec<RawResource>, ProviderError>;

    /// Returns the provider document of one resource.
    async fn inspect(&self, kind: ResourceKind, id: &str) -> Result<Value, ProviderError>;

    /// Returns the readable content of one resource (container logs).
    async fn read_content(&self, kind: ResourceKind, id: &str) -> Result<Bytes, ProviderError>;

    /// Lists every file stored in a volume, keyed by its path.
    async fn list_volume_objects(&self, volume: &str) -> Result<Vec<ObjectAttrs>, ProviderError>;

    /// Reads one file stored in a volume.
    async fn read_volume_object(&self, volume: &str, key: &str) -> Result<Bytes, ProviderError>;
}

/// Client of an object storage service (buckets, objects).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the provider name used as the root directory.
    fn name(&self) -> &str;

    /// Whether `list_objects` honours [`ObjectQuery::delimiter`].
    fn supports_delimiter(&self) -> bool {
        true
    }

    /// Lists every bucket.
    async fn list_buckets(&self) -> Result<Vec<BucketAttrs>, ProviderError>;

    /// Returns the attributes of one bucket.
    async fn bucket_attrs(&self, bucket: &str) -> Result<BucketAttrs, ProviderError>;

    /// Returns the stored size of a bucket, when a metric is available.
    async fn bucket_size(&self, _bucket: &str) -> Result<Option<u64>, ProviderError> {
        Ok(None)
    }

    /// Returns the attributes of one object.
    async fn object_attrs(&self, bucket: &str, key: &str) -> Result<ObjectAttrs, ProviderError>;

    /// Reads one object.
    async fn read_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError>;

    /// Lists objects matching a query, in provider order.
    async fn list_objects(
        &self,
        bucket: &str,
        query: &ObjectQuery,
    ) -> Result<Vec<ListItem>, ProviderError>;

    /// Deletes one object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError>;

    /// Deletes an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError>;
}
