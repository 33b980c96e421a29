use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use strata_core::{Attributes, FsError, OpContext, ResourceKind};
use tracing::debug;

use crate::entry::{Capabilities, Entry, EntryKind};
use crate::lister::ResourceLister;

/// A container, presented as a file whose content is its log.
#[derive(Debug)]
pub struct ContainerEntry {
    lister: Arc<ResourceLister>,
    id: String,
}

impl ContainerEntry {
    /// Creates the entry for container `id`.
    pub fn new(lister: Arc<ResourceLister>, id: &str) -> Self {
        Self {
            lister,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl Entry for ContainerEntry {
    fn name(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntryKind {
        EntryKind::File
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_read()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        let Some(buffer) = self.lister.streams().get(&self.id) else {
            return Ok(Attributes::new());
        };
        Ok(Attributes::new()
            .with_mtime(buffer.last_update())
            .with_size(buffer.len() as u64))
    }

    async fn metadata(&self, ctx: &OpContext) -> Result<Value, FsError> {
        ctx.run(
            self.lister
                .provider()
                .inspect(ResourceKind::Container, &self.id),
        )
        .await
    }

    async fn read(&self, ctx: &OpContext) -> Result<Bytes, FsError> {
        let content = ctx
            .run(
                self.lister
                    .provider()
                    .read_content(ResourceKind::Container, &self.id),
            )
            .await?;
        self.lister
            .streams()
            .get_or_insert(&self.id)
            .replace(&content);
        debug!(container = %self.id, size = content.len(), "Read container log");
        Ok(content)
    }
}
