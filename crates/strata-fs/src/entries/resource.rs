use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use strata_core::{Attributes, FsError, OpContext, ResourceKind};
use strata_store::ListingCache;

use crate::entry::{Capabilities, Entry, EntryKind, Node};
use crate::lister::ResourceLister;
use crate::provider::ResourceProvider;

/// Root directory of a container provider, one child per resource kind.
#[derive(Debug)]
pub struct ProviderRoot {
    name: String,
    kinds: Vec<Arc<ResourceKindEntry>>,
}

impl ProviderRoot {
    /// Creates the root with a lister for every supported kind.
    pub fn new(provider: Arc<dyn ResourceProvider>, cache: Arc<ListingCache>) -> Self {
        let kinds = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let lister = ResourceLister::new(kind, provider.clone(), cache.clone());
                Arc::new(ResourceKindEntry::new(Arc::new(lister)))
            })
            .collect();
        Self {
            name: provider.name().to_string(),
            kinds,
        }
    }

    /// Returns the directory of one kind.
    pub fn kind(&self, kind: ResourceKind) -> Option<&Arc<ResourceKindEntry>> {
        self.kinds.iter().find(|entry| entry.lister().kind() == kind)
    }
}

#[async_trait]
impl Entry for ProviderRoot {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn list(&self, _ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        Ok(self.kinds.iter().map(|k| k.clone() as Node).collect())
    }
}

/// Directory holding every resource of one kind.
#[derive(Debug)]
pub struct ResourceKindEntry {
    lister: Arc<ResourceLister>,
}

impl ResourceKindEntry {
    /// Wraps a lister.
    pub fn new(lister: Arc<ResourceLister>) -> Self {
        Self { lister }
    }

    /// Returns the lister backing this directory.
    pub fn lister(&self) -> &Arc<ResourceLister> {
        &self.lister
    }
}

#[async_trait]
impl Entry for ResourceKindEntry {
    fn name(&self) -> &str {
        self.lister.kind().as_str()
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn attributes(&self, _ctx: &OpContext) -> Result<Attributes, FsError> {
        // Content updates arrive asynchronously, so the directory mtime
        // tracks the freshest listing or stream of this kind.
        Ok(Attributes::new().with_mtime(self.lister.freshness()))
    }

    async fn metadata(&self, _ctx: &OpContext) -> Result<serde_json::Value, FsError> {
        Ok(json!({
            "kind": self.lister.kind(),
            "provider": self.lister.provider().name(),
        }))
    }

    async fn list(&self, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        self.lister.list(ctx).await
    }

    async fn find(&self, ctx: &OpContext, name: &str) -> Result<Node, FsError> {
        self.lister.find(ctx, name).await
    }

    // Resource ids are unique within a kind.
    async fn find_kind(
        &self,
        ctx: &OpContext,
        name: &str,
        _prefer: EntryKind,
    ) -> Result<Node, FsError> {
        self.lister.find(ctx, name).await
    }
}
