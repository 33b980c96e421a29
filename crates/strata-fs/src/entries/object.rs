use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use strata_core::{Attributes, FsError, OpContext};
use tracing::info;

use crate::delete::delete_tree;
use crate::entry::{Capabilities, Entry, EntryKind, Node};
use crate::hierarchy::list_children;
use crate::provider::{ObjectAttrs, ObjectStore};

/// A stored object, presented as a file.
pub struct ObjectEntry {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    name: String,
    attrs: ObjectAttrs,
}

impl ObjectEntry {
    /// Creates the entry for an object listed under its parent prefix.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        name: impl Into<String>,
        attrs: ObjectAttrs,
    ) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            name: name.into(),
            attrs,
        }
    }

    /// Returns the full object key.
    pub fn key(&self) -> &str {
        &self.attrs.name
    }
}

impl std::fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("bucket", &self.bucket)
            .field("key", &self.attrs.name)
            .finish()
    }
}

#[async_trait]
impl Entry for ObjectEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::File
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_read().with_delete()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        Ok(self.attrs.to_attributes())
    }

    async fn metadata(&self, ctx: &OpContext) -> Result<Value, FsError> {
        let attrs = ctx
            .run(self.store.object_attrs(&self.bucket, &self.attrs.name))
            .await?;
        Ok(serde_json::to_value(attrs)?)
    }

    async fn read(&self, ctx: &OpContext) -> Result<Bytes, FsError> {
        ctx.run(self.store.read_object(&self.bucket, &self.attrs.name))
            .await
    }

    async fn delete(&self, ctx: &OpContext) -> Result<bool, FsError> {
        ctx.run(self.store.delete_object(&self.bucket, &self.attrs.name))
            .await?;
        info!(bucket = %self.bucket, key = %self.attrs.name, "Deleted object");
        Ok(true)
    }
}

/// A shared key prefix, presented as a directory.
///
/// The prefix is synthetic: it exists while at least one key shares it.
pub struct PrefixEntry {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    name: String,
    prefix: String,
    /// Attributes of a marker object stored at the prefix, if any
    attrs: Option<ObjectAttrs>,
}

impl PrefixEntry {
    /// Creates the entry for `prefix`, which ends with the delimiter.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        name: impl Into<String>,
        prefix: impl Into<String>,
        attrs: Option<ObjectAttrs>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            name: name.into(),
            prefix: prefix.into(),
            attrs,
        }
    }

    /// Returns the full prefix, delimiter included.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for PrefixEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixEntry")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl Entry for PrefixEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list().with_delete()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        Ok(self
            .attrs
            .as_ref()
            .map(ObjectAttrs::to_attributes)
            .unwrap_or_default())
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        list_children(&self.store, &self.bucket, &self.prefix, ctx).await
    }

    async fn delete(&self, ctx: &OpContext) -> Result<bool, FsError> {
        delete_tree(&self.store, &self.bucket, &self.prefix, ctx).await?;
        Ok(true)
    }
}
