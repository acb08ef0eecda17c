//! Strata - Docker layer-cache orchestration for CI
//!
//! Keeps build-environment images warm across CI hosts: pulls cached
//! image archives from object storage, rebuilds with Docker's own layer
//! cache, and pushes updated archives back.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod remote;
pub mod ui;

pub use error::{StrataError, StrataResult};
