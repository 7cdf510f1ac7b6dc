//! NIMBUS — Location-aware weather forecast service.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod providers;
pub mod normalize;
pub mod store;
pub mod resolve;
pub mod server;
