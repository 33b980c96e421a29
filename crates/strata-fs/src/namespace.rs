//! The top of the projected tree.

use std::sync::Arc;

use async_trait::async_trait;
use strata_core::{FsError, OpContext};
use strata_store::ListingCache;

use crate::entries::{ProviderRoot, StorageRoot};
use crate::entry::{Capabilities, Entry, EntryKind, Node};
use crate::provider::{ObjectStore, ResourceProvider};

/// Root directory holding one child per configured provider.
///
/// The set of providers is fixed when the namespace is built.
#[derive(Debug, Default)]
pub struct Namespace {
    children: Vec<Node>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a container provider sharing `cache`.
    pub fn with_resources(
        mut self,
        provider: Arc<dyn ResourceProvider>,
        cache: Arc<ListingCache>,
    ) -> Self {
        self.children
            .push(Arc::new(ProviderRoot::new(provider, cache)));
        self
    }

    /// Adds an object store.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.children.push(Arc::new(StorageRoot::new(store)));
        self
    }

    /// Returns the namespace as a node.
    pub fn into_node(self) -> Node {
        Arc::new(self)
    }
}

#[async_trait]
impl Entry for Namespace {
    fn name(&self) -> &str {
        ""
    }

    fn kind(&self) -> EntryKind {
        EntryKind::Dir
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_list()
    }

    async fn list(&self, _ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        Ok(self.children.clone())
    }
}
