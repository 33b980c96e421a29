//! Strata Core - shared vocabulary for the strata projection engine.
//!
//! This crate provides:
//! - Timestamps used for entry attributes and cache freshness
//! - Resource kinds served by container providers
//! - Entry attributes (mtime/ctime/crtime, size, metadata)
//! - The cancellable operation context every provider call is bound to
//! - The error taxonomy and its errno translation

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod attributes;
pub mod context;
pub mod error;
pub mod kind;
pub mod time;

pub use attributes::Attributes;
pub use context::OpContext;
pub use error::{FsError, ProviderError};
pub use kind::ResourceKind;
pub use time::Timestamp;

/// Delimiter used to impose hierarchy on flat object keys.
pub const DELIMITER: &str = "/";
