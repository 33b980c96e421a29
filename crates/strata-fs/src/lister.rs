//! Cached listing of one resource kind.
//!
//! A [`ResourceLister`] turns the provider's listing of a kind (containers,
//! volumes) into identifiers held by the shared [`ListingCache`], and
//! projects those identifiers into entries on demand.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use strata_core::{FsError, OpContext, ResourceKind, Timestamp};
use strata_store::{FreshnessMap, ListingCache, ListingSnapshot};
use tracing::{debug, warn};

use crate::entries::{ContainerEntry, VolumeEntry};
use crate::entry::Node;
use crate::provider::{ListFilter, ResourceProvider};

/// Lister for one resource kind of one provider.
pub struct ResourceLister {
    kind: ResourceKind,
    provider: Arc<dyn ResourceProvider>,
    cache: Arc<ListingCache>,
    /// When the provider listing last succeeded, in ms since epoch
    updated: AtomicI64,
    /// Stream buffers of entries of this kind
    streams: FreshnessMap,
}

impl ResourceLister {
    /// Creates a lister.
    pub fn new(
        kind: ResourceKind,
        provider: Arc<dyn ResourceProvider>,
        cache: Arc<ListingCache>,
    ) -> Self {
        Self {
            kind,
            provider,
            cache,
            updated: AtomicI64::new(Timestamp::EPOCH.as_millis()),
            streams: FreshnessMap::new(),
        }
    }

    /// Returns the kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the provider.
    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> &Arc<ListingCache> {
        &self.cache
    }

    /// Returns the stream buffers of this kind.
    pub fn streams(&self) -> &FreshnessMap {
        &self.streams
    }

    /// Returns the cache key of the listing, e.g. `docker/container`.
    pub fn cache_key(&self) -> String {
        format!("{}/{}", self.provider.name(), self.kind)
    }

    /// Returns the cache key of one resource's document.
    pub fn document_key(&self, id: &str) -> String {
        format!("{}/{}", self.cache_key(), id)
    }

    /// Returns when the provider listing last succeeded.
    pub fn last_updated(&self) -> Timestamp {
        Timestamp::new(self.updated.load(Ordering::Acquire))
    }

    /// Returns the most recent update of the listing or any stream buffer.
    pub fn freshness(&self) -> Timestamp {
        let streams = self.streams.latest_update();
        Timestamp::latest(Some(self.last_updated()), streams).unwrap_or(Timestamp::EPOCH)
    }

    /// Returns the cached identifiers, fetching them on a miss.
    pub async fn identifiers(&self, ctx: &OpContext) -> Result<Arc<ListingSnapshot>, FsError> {
        ctx.check()?;
        let key = self.cache_key();
        self.cache
            .cached_strings(&key, || async {
                let resources = ctx
                    .run(self.provider.list_all(self.kind, &ListFilter::default()))
                    .await?;

                let mut ids = Vec::with_capacity(resources.len());
                for resource in resources {
                    if self.kind == ResourceKind::Volume {
                        // The listing carries the same document inspect returns.
                        match serde_json::to_vec(&resource.document) {
                            Ok(js) => self.cache.set(&self.document_key(&resource.id), js),
                            Err(err) => {
                                warn!(volume = %resource.id, error = %err, "Unable to encode volume document")
                            }
                        }
                    }
                    ids.push(resource.id);
                }

                self.updated
                    .store(Timestamp::now().as_millis(), Ordering::Release);
                Ok::<_, FsError>(ids)
            })
            .await
    }

    /// Drops the cached listing and documents of this kind.
    pub fn invalidate(&self) {
        self.cache.invalidate_prefix(&self.cache_key());
    }

    /// Lists every resource of the kind as entries.
    pub async fn list(self: &Arc<Self>, ctx: &OpContext) -> Result<Vec<Node>, FsError> {
        let snapshot = self.identifiers(ctx).await?;
        debug!(kind = %self.kind, count = snapshot.len(), "Listing resources");
        Ok(snapshot
            .identifiers()
            .iter()
            .map(|id| self.project(id))
            .collect())
    }

    /// Finds one resource by exact identifier.
    pub async fn find(self: &Arc<Self>, ctx: &OpContext, name: &str) -> Result<Node, FsError> {
        let snapshot = self.identifiers(ctx).await?;
        if snapshot.contains(name) {
            debug!(kind = %self.kind, name = %name, "Found resource");
            Ok(self.project(name))
        } else {
            debug!(kind = %self.kind, name = %name, "Resource not found");
            Err(FsError::NotFound(name.to_string()))
        }
    }

    /// Wraps an identifier into the entry type of the kind.
    pub fn project(self: &Arc<Self>, id: &str) -> Node {
        match self.kind {
            ResourceKind::Container => Arc::new(ContainerEntry::new(self.clone(), id)) as Node,
            ResourceKind::Volume => Arc::new(VolumeEntry::new(self.clone(), id)),
        }
    }
}

impl std::fmt::Debug for ResourceLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLister")
            .field("provider", &self.provider.name())
            .field("kind", &self.kind)
            .finish()
    }
}
