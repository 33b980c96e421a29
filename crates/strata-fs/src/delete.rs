//! Cascading deletion of object prefixes and buckets.
//!
//! Object stores only delete empty buckets and have no batch delete, so a
//! directory-like entry is removed by deleting every key under its prefix
//! one at a time. The operation is not transactional: a failure leaves the
//! already deleted keys gone. Running the delete again finishes the job,
//! since the remaining keys still match the prefix.

use std::sync::Arc;

use strata_core::{FsError, OpContext};
use tracing::{debug, info};

use crate::provider::{ListItem, ObjectQuery, ObjectStore};

/// Deletes every object whose key starts with `prefix`.
///
/// Keys are enumerated with a flat query, so every descendant is reached,
/// and deleted sequentially in enumeration order. The first failure aborts
/// the walk and is returned as [`FsError::PartialDelete`]. Returns the number
/// of objects deleted.
pub async fn delete_tree(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    prefix: &str,
    ctx: &OpContext,
) -> Result<usize, FsError> {
    let items = ctx
        .run(store.list_objects(bucket, &ObjectQuery::flat(prefix)))
        .await?;

    let mut deleted = 0;
    for item in items {
        let ListItem::Object(attrs) = item else {
            continue;
        };
        match ctx.run(store.delete_object(bucket, &attrs.name)).await {
            Ok(()) => {
                deleted += 1;
                debug!(bucket = %bucket, key = %attrs.name, "Deleted object");
            }
            Err(FsError::Provider(source)) => {
                return Err(FsError::PartialDelete {
                    key: attrs.name,
                    deleted,
                    source,
                });
            }
            Err(err) => return Err(err),
        }
    }

    info!(bucket = %bucket, prefix = %prefix, deleted, "Deleted objects");
    Ok(deleted)
}

/// Empties a bucket, then deletes it.
///
/// The bucket delete is only attempted once every object is gone.
pub async fn delete_bucket(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    ctx: &OpContext,
) -> Result<usize, FsError> {
    let deleted = delete_tree(store, bucket, "", ctx).await?;
    ctx.run(store.delete_bucket(bucket)).await?;
    info!(bucket = %bucket, "Deleted bucket");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use strata_core::ProviderError;

    use crate::memory::MemoryStore;
    use crate::provider::{BucketAttrs, ObjectAttrs};

    /// Store that refuses to delete one key.
    struct Stubborn {
        inner: MemoryStore,
        key: String,
    }

    #[async_trait]
    impl ObjectStore for Stubborn {
        fn name(&self) -> &str {
            self.inner.name()
        }
        async fn list_buckets(&self) -> Result<Vec<BucketAttrs>, ProviderError> {
            self.inner.list_buckets().await
        }
        async fn bucket_attrs(&self, bucket: &str) -> Result<BucketAttrs, ProviderError> {
            self.inner.bucket_attrs(bucket).await
        }
        async fn object_attrs(&self, bucket: &str, key: &str) -> Result<ObjectAttrs, ProviderError> {
            self.inner.object_attrs(bucket, key).await
        }
        async fn read_object(&self, bucket: &str, key: &str) -> Result<Bytes, ProviderError> {
            self.inner.read_object(bucket, key).await
        }
        async fn list_objects(
            &self,
            bucket: &str,
            query: &ObjectQuery,
        ) -> Result<Vec<ListItem>, ProviderError> {
            self.inner.list_objects(bucket, query).await
        }
        async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
            if key == self.key {
                return Err(ProviderError::PermissionDenied(key.to_string()));
            }
            self.inner.delete_object(bucket, key).await
        }
        async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
            self.inner.delete_bucket(bucket).await
        }
    }

    fn populated() -> MemoryStore {
        let store = MemoryStore::empty("storage");
        for key in ["a/1", "a/2", "a/x/3", "b"] {
            store.put_object("bkt", key, key.to_string());
        }
        store
    }

    #[tokio::test]
    async fn test_delete_tree_scoped_to_prefix() {
        let memory = Arc::new(populated());
        let store: Arc<dyn ObjectStore> = memory.clone();

        let deleted = delete_tree(&store, "bkt", "a/", &OpContext::new())
            .await
            .unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(memory.keys("bkt"), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_delete_reports_progress() {
        let store: Arc<dyn ObjectStore> = Arc::new(Stubborn {
            inner: populated(),
            key: "a/2".into(),
        });

        let err = delete_tree(&store, "bkt", "a/", &OpContext::new())
            .await
            .unwrap_err();
        match err {
            FsError::PartialDelete { key, deleted, source } => {
                assert_eq!(key, "a/2");
                assert_eq!(deleted, 1);
                assert!(matches!(source, ProviderError::PermissionDenied(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_bucket_empties_first() {
        let memory = Arc::new(populated());
        let store: Arc<dyn ObjectStore> = memory.clone();

        let deleted = delete_bucket(&store, "bkt", &OpContext::new()).await.unwrap();
        assert_eq!(deleted, 4);
        assert!(!memory.has_bucket("bkt"));
    }

    #[tokio::test]
    async fn test_cancelled_delete_touches_nothing() {
        let memory = Arc::new(populated());
        let store: Arc<dyn ObjectStore> = memory.clone();
        let ctx = OpContext::new();
        ctx.cancel();

        let err = delete_tree(&store, "bkt", "", &ctx).await.unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
        assert_eq!(memory.keys("bkt").len(), 4);
    }
}
