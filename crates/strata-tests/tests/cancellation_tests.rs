//! Cancellation integration tests.
//!
//! A cancelled operation context aborts the in-flight provider call and is
//! reported as a cancellation, never as a provider failure.

use std::time::Duration;

use strata_core::{FsError, OpContext};
use strata_fs::Entry;
use strata_tests::TestWorld;
use tokio::time::timeout;

/// Initialize tracing for tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("strata_tests=debug,strata_fs=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_cancel_in_flight_listing() {
    init_tracing();

    let world = TestWorld::new();
    let containers = world.resolve("docker/container").await.unwrap();
    world.runtime_spy.set_latency(Duration::from_secs(30));

    let ctx = OpContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = timeout(Duration::from_secs(5), containers.list(&ctx))
        .await
        .expect("cancellation should abort the call");
    let err = result.unwrap_err();
    assert!(matches!(err, FsError::Cancelled));
    assert_eq!(err.errno(), libc::EINTR);

    // Nothing was published; the next lookup fetches again.
    world.runtime_spy.set_latency(Duration::ZERO);
    assert_eq!(world.names("docker/container").await.unwrap().len(), 2);
    assert_eq!(world.runtime_spy.calls().count("list_all"), 2);
}

#[tokio::test]
async fn test_cancelled_context_fails_fast() {
    init_tracing();

    let world = TestWorld::new();
    let containers = world.resolve("docker/container").await.unwrap();
    let ctx = OpContext::new();
    ctx.cancel();

    assert!(matches!(
        containers.find(&ctx, "abc123").await,
        Err(FsError::Cancelled)
    ));
    assert_eq!(world.runtime_spy.calls().count("list_all"), 0);
}

#[tokio::test]
async fn test_cancel_stops_cascading_delete() {
    init_tracing();

    let world = TestWorld::new();
    for i in 0..20 {
        world.store.put_object("big", &format!("tree/{i:02}"), "x");
    }
    let tree = world.resolve("gcs/big/tree").await.unwrap();
    world.store_spy.set_latency(Duration::from_millis(10));

    let ctx = OpContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(55)).await;
        canceller.cancel();
    });

    let err = tree.delete(&ctx).await.unwrap_err();
    assert!(matches!(err, FsError::Cancelled));

    let remaining = world.store.keys("big").len();
    assert!(remaining > 0 && remaining < 20, "remaining {remaining}");

    // Recovery with a fresh context.
    world.store_spy.set_latency(Duration::ZERO);
    assert!(tree.delete(&OpContext::new()).await.unwrap());
    assert!(world.store.keys("big").is_empty());
}

#[tokio::test]
async fn test_child_context_follows_parent() {
    init_tracing();

    let world = TestWorld::new();
    let photos = world.resolve("gcs/photos").await.unwrap();
    world.store_spy.set_latency(Duration::from_secs(30));

    let parent = OpContext::new();
    let child = parent.child();
    let canceller = parent.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = timeout(Duration::from_secs(5), photos.metadata(&child))
        .await
        .expect("parent cancellation should reach the child");
    assert!(matches!(result, Err(FsError::Cancelled)));
}
