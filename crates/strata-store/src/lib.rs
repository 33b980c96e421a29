//! Strata Store - in-memory caching for projected listings.
//!
//! Provides:
//! - A single-flight listing cache with immutable, timestamped snapshots
//! - A blob side-cache for per-resource documents
//! - Concurrent freshness tracking for per-entry stream buffers

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod freshness;

pub use cache::{CacheStats, ListingCache, ListingSnapshot};
pub use config::CacheConfig;
pub use freshness::{FreshnessMap, StreamBuffer};
