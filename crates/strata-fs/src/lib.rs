//! Strata Filesystem - projection of cloud resources onto a browsable tree.
//!
//! Implements:
//! - The entry abstraction and path resolution
//! - Cached resource listings with single-flight fetches
//! - Directory structure imposed on flat object keys
//! - Cascading deletion of prefixes and buckets
//! - Fixture-backed in-memory providers

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod delete;
pub mod entries;
pub mod entry;
pub mod hierarchy;
pub mod lister;
pub mod memory;
pub mod namespace;
pub mod provider;

pub use entry::{resolve, Capabilities, Entry, EntryKind, Node};
pub use lister::ResourceLister;
pub use memory::{Fixture, FixtureError, MemoryRuntime, MemoryStore};
pub use namespace::Namespace;
pub use provider::{
    BucketAttrs, ListFilter, ListItem, ObjectAttrs, ObjectQuery, ObjectStore, RawResource,
    ResourceProvider,
};
