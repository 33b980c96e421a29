//! Hierarchy projection tests.
//!
//! Tests for the tree imposed on object keys:
//! - Lossless mapping between flat keys and tree paths
//! - Marker objects never listed as their own children
//! - Grouped and locally grouped listings agree
//! - Group attribute failures are swallowed

use std::collections::BTreeSet;
use std::sync::Arc;

use strata_core::{OpContext, ResourceKind};
use strata_fs::{resolve, Entry, EntryKind, MemoryStore, Namespace, Node, ObjectStore};
use strata_store::CacheConfig;
use strata_tests::{InstrumentedStore, TestWorld};

/// Initialize tracing for tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("strata_tests=debug,strata_fs=debug")
        .with_test_writer()
        .try_init();
}

fn store_with(keys: &[&str]) -> MemoryStore {
    let store = MemoryStore::empty("gcs");
    store.create_bucket("bkt");
    for key in keys {
        store.put_object("bkt", key, key.to_string());
    }
    store
}

fn bucket_node(store: Arc<dyn ObjectStore>) -> Node {
    Namespace::new().with_store(store).into_node()
}

/// Collects the full key of every leaf reachable from `dir`.
async fn walk(dir: Node, prefix: String, ctx: &OpContext, out: &mut Vec<String>) {
    let mut pending = vec![(dir, prefix)];
    while let Some((node, prefix)) = pending.pop() {
        let children = node.list(ctx).await.unwrap();
        let mut names = BTreeSet::new();
        for child in children {
            let shape = (child.name().to_string(), child.kind() == EntryKind::Dir);
            assert!(names.insert(shape), "duplicate child");
            assert!(!child.name().contains('/'));
            match child.kind() {
                EntryKind::Dir => {
                    let next = format!("{prefix}{}/", child.name());
                    pending.push((child, next));
                }
                EntryKind::File => out.push(format!("{prefix}{}", child.name())),
            }
        }
    }
}

async fn leaves(store: Arc<dyn ObjectStore>) -> BTreeSet<String> {
    let ctx = OpContext::new();
    let root = bucket_node(store);
    let bucket = resolve(&root, "gcs/bkt", &ctx).await.unwrap();
    let mut out = Vec::new();
    walk(bucket, String::new(), &ctx, &mut out).await;

    let set: BTreeSet<String> = out.iter().cloned().collect();
    assert_eq!(set.len(), out.len(), "leaf reached twice");
    set
}

#[tokio::test]
async fn test_listing_example() {
    init_tracing();

    let store: Arc<dyn ObjectStore> = Arc::new(store_with(&["a/b", "a/c", "d"]));
    let ctx = OpContext::new();
    let root = bucket_node(store);

    let bucket = resolve(&root, "gcs/bkt", &ctx).await.unwrap();
    let top = bucket.list(&ctx).await.unwrap();
    let shape: Vec<_> = top.iter().map(|n| (n.name().to_string(), n.kind())).collect();
    assert_eq!(
        shape,
        vec![("a".to_string(), EntryKind::Dir), ("d".to_string(), EntryKind::File)]
    );

    let group = resolve(&root, "gcs/bkt/a", &ctx).await.unwrap();
    let children = group.list(&ctx).await.unwrap();
    let shape: Vec<_> = children
        .iter()
        .map(|n| (n.name().to_string(), n.kind()))
        .collect();
    assert_eq!(
        shape,
        vec![("b".to_string(), EntryKind::File), ("c".to_string(), EntryKind::File)]
    );
}

#[tokio::test]
async fn test_bijection() {
    init_tracing();

    let key_sets: Vec<Vec<&str>> = vec![
        vec!["a/b", "a/c", "d"],
        vec!["x"],
        vec!["deep/er/and/deeper/leaf", "deep/sibling", "deep/er/z"],
        vec!["p/q/r", "pq", "p/qq", "p/q/s"],
        vec!["p/q", "p/q/r"],
        vec!["p/q/r", "p/q", "p"],
        vec!["photos/2024/a.jpg", "photos/2024/b.jpg", "photos/2023/c.jpg", "notes.txt"],
    ];

    for keys in key_sets {
        let expected: BTreeSet<String> = keys.iter().map(|k| k.to_string()).collect();

        let grouped = leaves(Arc::new(store_with(&keys))).await;
        assert_eq!(grouped, expected, "grouped listing of {keys:?}");

        let local = leaves(Arc::new(store_with(&keys).without_delimiter_queries())).await;
        assert_eq!(local, expected, "local grouping of {keys:?}");

        // Every key is reachable by its own path and reads back its content.
        let ctx = OpContext::new();
        let root = bucket_node(Arc::new(store_with(&keys)));
        for key in &keys {
            let node = resolve(&root, &format!("gcs/bkt/{key}"), &ctx).await.unwrap();
            assert_eq!(node.kind(), EntryKind::File, "{key}");
            assert_eq!(node.read(&ctx).await.unwrap().as_ref(), key.as_bytes());
        }
    }
}

#[tokio::test]
async fn test_leaf_and_group_share_a_name() {
    init_tracing();

    let store: Arc<dyn ObjectStore> = Arc::new(store_with(&["p/q", "p/q/r"]));
    let ctx = OpContext::new();
    let root = bucket_node(store);

    let p = resolve(&root, "gcs/bkt/p", &ctx).await.unwrap();
    let kinds: Vec<_> = p
        .list(&ctx)
        .await
        .unwrap()
        .iter()
        .map(|n| (n.name().to_string(), n.kind()))
        .collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&("q".to_string(), EntryKind::File)));
    assert!(kinds.contains(&("q".to_string(), EntryKind::Dir)));

    let leaf = resolve(&root, "gcs/bkt/p/q", &ctx).await.unwrap();
    assert_eq!(leaf.kind(), EntryKind::File);

    let group = resolve(&root, "gcs/bkt/p/q/", &ctx).await.unwrap();
    assert_eq!(group.kind(), EntryKind::Dir);
    let names: Vec<_> = group
        .list(&ctx)
        .await
        .unwrap()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    assert_eq!(names, vec!["r"]);

    let deep = resolve(&root, "gcs/bkt/p/q/r", &ctx).await.unwrap();
    assert_eq!(deep.read(&ctx).await.unwrap().as_ref(), b"p/q/r");
}

#[tokio::test]
async fn test_self_exclusion() {
    init_tracing();

    let store: Arc<dyn ObjectStore> = Arc::new(store_with(&["a/", "a/b", "a/c/", "a/c/d"]));
    let ctx = OpContext::new();
    let root = bucket_node(store);

    let a = resolve(&root, "gcs/bkt/a", &ctx).await.unwrap();
    let names: Vec<_> = a
        .list(&ctx)
        .await
        .unwrap()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    assert_eq!(names, vec!["b", "c"]);

    let c = resolve(&root, "gcs/bkt/a/c", &ctx).await.unwrap();
    let names: Vec<_> = c
        .list(&ctx)
        .await
        .unwrap()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    assert_eq!(names, vec!["d"]);
}

#[tokio::test]
async fn test_marker_attributes_carried_by_group() {
    init_tracing();

    let world = TestWorld::new();
    let ctx = OpContext::new();

    let group = world.resolve("gcs/logs/2024").await.unwrap();
    let attrs = group.attributes(&ctx).await.unwrap();
    assert_eq!(attrs.size, Some(0));
    assert!(attrs.mtime.is_some());

    let names = world.names("gcs/logs/2024").await.unwrap();
    assert_eq!(names, vec!["01", "02"]);
}

#[tokio::test]
async fn test_group_attribute_failure_is_swallowed() {
    init_tracing();

    let spy = Arc::new(InstrumentedStore::new(Arc::new(store_with(&["a/b", "d"]))));
    spy.break_attrs("a/");
    let ctx = OpContext::new();
    let root = bucket_node(spy.clone());

    let bucket = resolve(&root, "gcs/bkt", &ctx).await.unwrap();
    let children = bucket.list(&ctx).await.unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name(), "a");

    let attrs = children[0].attributes(&ctx).await.unwrap();
    assert!(attrs.is_empty());
    assert_eq!(spy.calls().count("object_attrs"), 1);
}

#[tokio::test]
async fn test_only_direct_children_requested() {
    init_tracing();

    let spy = Arc::new(InstrumentedStore::new(Arc::new(store_with(&[
        "a/1", "a/2", "a/3", "b",
    ]))));
    let ctx = OpContext::new();
    let root = bucket_node(spy.clone());

    let bucket = resolve(&root, "gcs/bkt", &ctx).await.unwrap();
    spy.calls().reset();
    bucket.list(&ctx).await.unwrap();

    assert_eq!(spy.calls().count("list_objects"), 1);
    // One attribute lookup for the single group, none for leaves.
    assert_eq!(spy.calls().count("object_attrs"), 1);
}

#[tokio::test]
async fn test_provider_order_preserved() {
    init_tracing();

    let keys = ["a/1", "b", "c/2", "d", "e"];
    for grouped in [true, false] {
        let inner = if grouped {
            store_with(&keys)
        } else {
            store_with(&keys).without_delimiter_queries()
        };
        let spy = Arc::new(InstrumentedStore::new(Arc::new(inner)));
        spy.reverse_listings(true);
        let ctx = OpContext::new();
        let root = bucket_node(spy.clone());

        let bucket = resolve(&root, "gcs/bkt", &ctx).await.unwrap();
        let names: Vec<_> = bucket
            .list(&ctx)
            .await
            .unwrap()
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(names, vec!["e", "d", "c", "b", "a"], "grouped queries: {grouped}");
    }
}

#[tokio::test]
async fn test_empty_prefix_lists_whole_bucket_top() {
    init_tracing();

    let world = TestWorld::from_fixture(strata_tests::world::DEFAULT_FIXTURE, CacheConfig::default());
    let names = world.names("gcs/photos").await.unwrap();
    assert_eq!(names, vec!["a", "d"]);
}

#[tokio::test]
async fn test_volume_contents_grouped_locally() {
    init_tracing();

    let world = TestWorld::new();
    let kind = ResourceKind::Volume.as_str();

    let top = world.names(&format!("docker/{kind}/data")).await.unwrap();
    assert_eq!(top, vec!["README", "etc"]);

    let etc = world.names(&format!("docker/{kind}/data/etc")).await.unwrap();
    assert_eq!(etc, vec!["app.conf", "tls"]);

    let ctx = OpContext::new();
    let cert = world
        .resolve(&format!("docker/{kind}/data/etc/tls/cert.pem"))
        .await
        .unwrap();
    assert_eq!(cert.read(&ctx).await.unwrap().as_ref(), b"---");
}
