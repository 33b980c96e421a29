//! Integration and end-to-end tests for strata.
//!
//! This crate provides:
//! - Instrumented providers that count calls, add latency and inject failures
//! - A test world wiring fixture-backed providers into a namespace
//! - Integration tests for listing, hierarchy, deletion and cancellation

pub mod harness;
pub mod world;

pub use harness::{InstrumentedRuntime, InstrumentedStore};
pub use world::TestWorld;
