//! Container engine abstraction
//!
//! Provides a trait for the engine operations the cache orchestrator
//! needs, so tests can run against an in-memory engine and the docker
//! binary stays swappable.

use crate::error::StrataResult;
use async_trait::async_trait;
use std::path::Path;

/// Abstract container engine interface
///
/// Implementations invoke the engine; they never reach inside its layer
/// cache. The observable build output is the only caching signal exposed.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check if the engine is available on this system
    async fn is_available(&self) -> bool;

    /// Build an image from a Dockerfile, tagging it on success.
    ///
    /// Streams every combined stdout/stderr line to `on_output` as it is
    /// produced. A nonzero exit surfaces as a build failure carrying the
    /// output tail.
    async fn build(
        &self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
        on_output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> StrataResult<()>;

    /// Check if an image exists locally under the tag
    async fn image_exists(&self, tag: &str) -> StrataResult<bool>;

    /// Remove a local image by tag. Removing an absent tag is a no-op.
    async fn remove_image(&self, tag: &str) -> StrataResult<()>;

    /// Export an image (all layers) to an engine-native tar archive
    async fn export_image(&self, tag: &str, dest: &Path) -> StrataResult<()>;

    /// Import an image archive into local engine state
    async fn import_image(&self, src: &Path) -> StrataResult<()>;

    /// Engine version string, if it can be determined
    async fn version(&self) -> StrataResult<String>;

    /// Human-readable engine name for display
    fn engine_name(&self) -> &'static str;
}
