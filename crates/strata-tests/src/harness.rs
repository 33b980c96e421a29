//! Instrumented provider wrappers.
//!
//! Both wrappers delegate to an inner provider and record how often each
//! call was made. Latency and failures can be injected to exercise the
//! single-flight cache, cancellation and partial deletes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use strata_core::{ProviderError, ResourceKind};
use strata_fs::{
    BucketAttrs, ListFilter, ListItem, ObjectAttrs, ObjectQuery, ObjectStore, RawResource,
    ResourceProvider,
};
use tokio::time::sleep;
use tracing::debug;

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CallLog {
    counts: Mutex<HashMap<&'static str, usize>>,
}

impl CallLog {
    fn record(&self, op: &'static str) {
        *self.counts.lock().entry(op).or_default() += 1;
    }

    /// Returns how often `op` was called.
    pub fn count(&self, op: &str) -> usize {
        self.counts.lock().get(op).copied().unwrap_or(0)
    }

    /// Returns the total number of calls.
    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }

    /// Forgets every recorded call.
    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}

/// Container runtime wrapper.
pub struct InstrumentedRuntime {
    inner: Arc<dyn ResourceProvider>,
    calls: CallLog,
    latency: RwLock<Duration>,
    failure: RwLock<Option<ProviderError>>,
}

impl InstrumentedRuntime {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ResourceProvider>) -> Self {
        Self {
            inner,
            calls: CallLog::default(),
            latency: RwLock::new(Duration::ZERO),
            failure: RwLock::new(None),
        }
    }

    /// Returns the call log.
    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Makes listings fail with `error` until cleared.
    pub fn fail_listings(&self, error: Option<ProviderError>) {
        *self.failure.write() = error;
    }

    async fn enter(&self, op: &'static str) {
        self.calls.record(op);
        let latency = *self.latency.read();
        if !latency.is_zero() {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl ResourceProvider for InstrumentedRuntime {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_all(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<Vec<RawResource>, ProviderError> {
        self.enter("list_all").await;
        if let Some(err) = self.failure.read().clone() {
            debug!(kind = %kind, error = %err, "Injected listing failure");
            return Err(err);
        }
        self.inner.list_all(kind, filter).await
    }

    async fn inspect(&self, kind: ResourceKind, id: &str) -> Result<Value, ProviderError> {
        self.enter("inspect").await;
        self.inner.inspect(kind, id).await
    }

    async fn read_content(&self, kind: ResourceKind, id: &str) -> Result<Bytes, ProviderError> {
        self.enter("read_content").await;
        self.inner.read_content(kind, id).await
    }

    async fn list_volume_objects(&self, volume: &str) -> Result<Vec<ObjectAttrs>, ProviderError> {
        self.enter("list_volume_objects").await;
        self.inner.list_volume_objects(volume).await
    }

    async fn read_volume_object(&self, volume: &str, key: &str) -> Result<Bytes, ProviderError> {
        self.enter("read_volume_object").await;
        self.inner.read_volume_object(volume, key).await
    }
}

/// Object store wrapper.
pub struct InstrumentedStore {
    inner: Arc<dyn ObjectStore>,
    calls: CallLog,
    latency: RwLock<Duration>,
    /// Successful deletes so far
    deletes: AtomicUsize,
    /// Fail the delete following this many successful ones
    fail_delete_after: RwLock<Option<usize>>,
    /// Fail object_attrs for these keys
    broken_attrs: RwLock<Vec<String>>,
    /// Return object listings back to front
    reversed: AtomicBool,
}

impl InstrumentedStore {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            calls: CallLog::default(),
            latency: RwLock::new(Duration::ZERO),
            deletes: AtomicUsize::new(0),
            fail_delete_after: RwLock::new(None),
            broken_attrs: RwLock::new(Vec::new()),
            reversed: AtomicBool::new(false),
        }
    }

    /// Returns the call log.
    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Fails the object delete issued after `successes` successful ones.
    ///
    /// `None` lets every delete through.
    pub fn fail_delete_after(&self, successes: Option<usize>) {
        self.deletes.store(0, Ordering::SeqCst);
        *self.fail_delete_after.write() = successes;
    }

    /// Makes attribute lookups of `key` fail with a network error.
    pub fn break_attrs(&self, key: &str) {
        self.broken_attrs.write().push(key.to_string());
    }

    /// Returns object listings in reverse of the inner provider's order.
    pub fn reverse_listings(&self, reversed: bool) {
        self.reversed.store(reversed, Ordering::SeqCst);
    }

    async fn enter(&self, op: &'static str) {
        self.calls.record(op);
        let latency = *self.latency.read();
        if !latency.is_zero() {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for InstrumentedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_delimiter(&self) -> bool {
        self.inner.supports_delimiter()
    }

    async fn list_buckets(&self) -> Result<Vec<BucketAttrs>, ProviderError> {
        self.enter("list_buckets").await;
        self.inner.list_buckets().await
    }

    async fn bucket_attrs(&self, bucket: &str) -> Result<BucketAttrs, ProviderError> {
        self.enter("bucket_attrs").await;
        self.inner.bucket_attrs(bucket).await
    }

    async fn bucket_size(&self, bucket: &str) -> Result<Option<u64>, ProviderError> {
        self.enter("bucket_size").await;
        self.inner.bucket_size(bucket).await
    }

    async fn object_attrs(&self, bucket: &str, key: &str) -> Result<ObjectAttrs, ProviderError> {
        self.enter("object_attrs").await;
        if self.broken_attrs.read().iter().any(|k| k == key) {
            return Err(ProviderError::Network(format!("attributes of {key}")));
        }
        self.inner.object_attrs(bucket, key).await
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError> {
        self.enter("read_object").await;
        self.inner.read_object(bucket, key).await
    }

    async fn list_objects(
        &self,
        bucket: &str,
        query: &ObjectQuery,
    ) -> Result<Vec<ListItem>, ProviderError> {
        self.enter("list_objects").await;
        let mut items = self.inner.list_objects(bucket, query).await?;
        if self.reversed.load(Ordering::SeqCst) {
            items.reverse();
        }
        Ok(items)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        self.enter("delete_object").await;
        if let Some(limit) = *self.fail_delete_after.read() {
            if self.deletes.load(Ordering::SeqCst) >= limit {
                debug!(bucket = %bucket, key = %key, "Injected delete failure");
                return Err(ProviderError::Network(format!("delete {bucket}/{key}")));
            }
        }
        self.inner.delete_object(bucket, key).await?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        self.enter("delete_bucket").await;
        self.inner.delete_bucket(bucket).await
    }
}
