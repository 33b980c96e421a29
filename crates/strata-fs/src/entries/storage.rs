use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use strata_core::{Attributes, FsError, OpContext};
use tracing::{debug, warn};

use crate::delete::delete_bucket;
use crate::entry::{Capabilities, Entry, EntryKind, Node};
use crate::hierarchy::list_children;
use crate::provider::{BucketAttrs, ObjectStore};

/// Description attached to bucket entries.
pub const BUCKET_DESCRIPTION: &str = "\
This is a storage bucket. For convenience, objects are grouped into
directories by their common key prefixes. For example, the objects
'foo/bar' and 'foo/baz' appear as the files 'foo/bar' and 'foo/baz',
with 'foo' shown as a directory. Listing the bucket therefore shows
only object prefixes (directories) and objects (files).
";

/// Root directory of an object store, one child per bucket.
pub struct StorageRoot {
    store: Arc<dyn ObjectStore>,
}

impl StorageRoot {
    /// Creates the root for `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for StorageRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRoot")
            .field("store", &self.store.name())
            .finish()
    }
}

#[async_trait]
impl Entry for StorageRoot {
    fn name(&self) -> &str {
        self.store.name()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        let buckets = ctx.run(self.store.list_buckets()).await?;
        debug!(store = %self.store.name(), count = buckets.len(), "Listing buckets");
        Ok(buckets
            .into_iter()
            .map(|attrs| Arc::new(BucketEntry::new(self.store.clone(), attrs)) as Node)
            .collect())
    }
}

/// A bucket, presented as a directory of its keys.
pub struct BucketEntry {
    store: Arc<dyn ObjectStore>,
    attrs: BucketAttrs,
}

impl BucketEntry {
    /// Creates the entry for a listed bucket.
    pub fn new(store: Arc<dyn ObjectStore>, attrs: BucketAttrs) -> Self {
        Self { store, attrs }
    }
}

impl std::fmt::Debug for BucketEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketEntry")
            .field("bucket", &self.attrs.name)
            .finish()
    }
}

#[async_trait]
impl Entry for BucketEntry {
    fn name(&self) -> &str {
        &self.attrs.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list().with_delete()
    }

    fn description(&self) -> Option<&str> {
        Some(BUCKET_DESCRIPTION)
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        let mut attrs = Attributes::new();
        if let Some(created) = self.attrs.created {
            attrs = attrs.with_created(created);
        }
        Ok(attrs.with_meta(serde_json::to_value(&self.attrs)?))
    }

    async fn metadata(&self, ctx: &OpContext) -> Result<Value, FsError> {
        let attrs = ctx.run(self.store.bucket_attrs(&self.attrs.name)).await?;

        let size = match ctx.run(self.store.bucket_size(&self.attrs.name)).await {
            Ok(size) => size,
            Err(FsError::Cancelled) => return Err(FsError::Cancelled),
            Err(err) => {
                warn!(bucket = %self.attrs.name, error = %err, "Unable to get bucket size");
                None
            }
        };

        let mut document = serde_json::to_value(attrs)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("size".to_string(), size.map_or(Value::Null, Value::from));
        }
        Ok(document)
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        list_children(&self.store, &self.attrs.name, "", ctx).await
    }

    async fn delete(&self, ctx: &OpContext) -> Result<bool, FsError> {
        // Buckets must be empty before they can be deleted.
        delete_bucket(&self.store, &self.attrs.name, ctx).await?;
        Ok(true)
    }
}
