use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use strata_core::{Attributes, FsError, OpContext, ResourceKind, DELIMITER};
use tracing::debug;

use crate::entry::{Capabilities, Entry, EntryKind, Node};
use crate::hierarchy::{group_items, group_name, leaf_name};
use crate::lister::ResourceLister;
use crate::provider::{ListItem, ObjectAttrs};

/// A volume, presented as a directory of the files it stores.
#[derive(Debug)]
pub struct VolumeEntry {
    lister: Arc<ResourceLister>,
    name: String,
}

impl VolumeEntry {
    /// Creates the entry for volume `name`.
    pub fn new(lister: Arc<ResourceLister>, name: &str) -> Self {
        Self {
            lister,
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Entry for VolumeEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        let mut attrs = Attributes::new();
        attrs.mtime = self
            .lister
            .cache()
            .last_update(&self.lister.document_key(&self.name));
        Ok(attrs)
    }

    async fn metadata(&self, ctx: &OpContext) -> Result<Value, FsError> {
        let key = self.lister.document_key(&self.name);
        if let Some(cached) = self.lister.cache().get(&key) {
            match serde_json::from_slice(&cached) {
                Ok(document) => return Ok(document),
                Err(err) => debug!(volume = %self.name, error = %err, "Discarding cached document"),
            }
        }
        ctx.run(
            self.lister
                .provider()
                .inspect(ResourceKind::Volume, &self.name),
        )
        .await
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        list_volume(&self.lister, &self.name, "", ctx).await
    }
}

/// A directory inside a volume.
#[derive(Debug)]
pub struct VolumeDirEntry {
    lister: Arc<ResourceLister>,
    volume: String,
    name: String,
    prefix: String,
}

#[async_trait]
impl Entry for VolumeDirEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        list_volume(&self.lister, &self.volume, &self.prefix, ctx).await
    }
}

/// A file stored in a volume.
#[derive(Debug)]
pub struct VolumeFileEntry {
    lister: Arc<ResourceLister>,
    volume: String,
    name: String,
    attrs: ObjectAttrs,
}

#[async_trait]
impl Entry for VolumeFileEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::File
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_read()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        Ok(self.attrs.to_attributes())
    }

    async fn read(&self, ctx: &OpContext) -> Result<Bytes, FsError> {
        ctx.run(
            self.lister
                .provider()
                .read_volume_object(&self.volume, &self.attrs.name),
        )
        .await
    }
}

/// Lists the direct children of `prefix` inside a volume.
///
/// Volumes expose a flat file listing, so grouping happens locally.
async fn list_volume(
    lister: &Arc<ResourceLister>,
    volume: &str,
    prefix: &str,
    ctx: &OpContext,
) -> Result<Vec<Node>, FsError> {
    let objects = ctx
        .run(lister.provider().list_volume_objects(volume))
        .await?;
    let items = group_items(
        objects.into_iter().map(ListItem::Object).collect(),
        prefix,
        DELIMITER,
    );

    let mut entries: Vec<Node> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ListItem::Prefix(full) => entries.push(Arc::new(VolumeDirEntry {
                lister: lister.clone(),
                volume: volume.to_string(),
                name: group_name(&full, prefix, DELIMITER).to_string(),
                prefix: full,
            })),
            ListItem::Object(attrs) if attrs.name == prefix => continue,
            ListItem::Object(attrs) => entries.push(Arc::new(VolumeFileEntry {
                lister: lister.clone(),
                volume: volume.to_string(),
                name: leaf_name(&attrs.name, prefix).to_string(),
                attrs,
            })),
        }
    }

    debug!(volume = %volume, prefix = %prefix, count = entries.len(), "Listed volume");
    Ok(entries)
}
