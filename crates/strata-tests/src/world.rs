//! Test world wiring fixture-backed providers into a namespace.

use std::sync::Arc;

use strata_core::{FsError, OpContext};
use strata_fs::{resolve, Entry, Fixture, MemoryRuntime, MemoryStore, Namespace, Node};
use strata_store::{CacheConfig, ListingCache};

use crate::harness::{InstrumentedRuntime, InstrumentedStore};

/// Fixture used by most integration tests.
pub const DEFAULT_FIXTURE: &str = r#"
[runtime]
name = "docker"

[[runtime.containers]]
id = "abc123"
image = "nginx:latest"
created = 1700000000000
logs = "listening on :80\n"

[[runtime.containers]]
id = "def456"
image = "redis:7"
logs = ""
[runtime.containers.labels]
app = "cache"

[[runtime.volumes]]
name = "data"
driver = "local"
[runtime.volumes.files]
"README" = "hello"
"etc/app.conf" = "port = 80"
"etc/tls/cert.pem" = "---"

[storage]
name = "gcs"

[[storage.buckets]]
name = "photos"
created = 1700000000000
location = "EU"
[storage.buckets.objects]
"a/b" = "1"
"a/c" = "22"
"d" = "333"

[[storage.buckets]]
name = "logs"
[storage.buckets.objects]
"2024/01/app.log" = "x"
"2024/02/app.log" = "y"
"2024/" = ""
"#;

/// Providers, cache and namespace of one test.
pub struct TestWorld {
    /// Memory runtime behind the instrumentation
    pub runtime: Arc<MemoryRuntime>,
    /// Memory store behind the instrumentation
    pub store: Arc<MemoryStore>,
    /// Instrumented runtime seen by the namespace
    pub runtime_spy: Arc<InstrumentedRuntime>,
    /// Instrumented store seen by the namespace
    pub store_spy: Arc<InstrumentedStore>,
    /// Shared listing cache
    pub cache: Arc<ListingCache>,
    /// Root of the projected tree
    pub root: Node,
}

impl TestWorld {
    /// Builds the world described by [`DEFAULT_FIXTURE`].
    pub fn new() -> Self {
        Self::from_fixture(DEFAULT_FIXTURE, CacheConfig::default())
    }

    /// Builds a world from a fixture document and cache configuration.
    ///
    /// Panics if the fixture does not parse.
    pub fn from_fixture(fixture: &str, config: CacheConfig) -> Self {
        let fixture = Fixture::from_toml(fixture).expect("valid fixture");
        let (runtime, store) = fixture.into_providers();
        Self::assemble(Arc::new(runtime), Arc::new(store), config)
    }

    /// Builds a world around existing providers.
    pub fn assemble(runtime: Arc<MemoryRuntime>, store: Arc<MemoryStore>, config: CacheConfig) -> Self {
        let runtime_spy = Arc::new(InstrumentedRuntime::new(runtime.clone()));
        let store_spy = Arc::new(InstrumentedStore::new(store.clone()));
        let cache = Arc::new(ListingCache::new(config));
        let root = Namespace::new()
            .with_resources(runtime_spy.clone(), cache.clone())
            .with_store(store_spy.clone())
            .into_node();

        Self {
            runtime,
            store,
            runtime_spy,
            store_spy,
            cache,
            root,
        }
    }

    /// Resolves `path` with a fresh context.
    pub async fn resolve(&self, path: &str) -> Result<Node, FsError> {
        resolve(&self.root, path, &OpContext::new()).await
    }

    /// Returns the child names of the directory at `path`.
    pub async fn names(&self, path: &str) -> Result<Vec<String>, FsError> {
        let ctx = OpContext::new();
        let dir = resolve(&self.root, path, &ctx).await?;
        Ok(dir
            .list(&ctx)
            .await?
            .iter()
            .map(|child| child.name().to_string())
            .collect())
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
