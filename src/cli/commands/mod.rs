//! Command implementations

mod build;
mod clean;
mod config;
mod load;
mod platforms;
mod save;
mod status;

pub use build::execute as build;
pub use clean::execute as clean;
pub use config::execute as config;
pub use load::execute as load;
pub use platforms::execute as platforms;
pub use save::execute as save;
pub use status::execute as status;

use crate::config::Config;
use crate::engine::DockerCli;
use crate::error::StrataResult;
use crate::platform;
use crate::remote::{ObjectStore, S3CliStore};
use std::path::PathBuf;
use std::sync::Arc;

use super::args::EngineArgs;

/// Engine settings after merging flags over config
pub(crate) struct EngineSelection {
    pub binary: String,
    pub docker_dir: PathBuf,
    pub namespace: String,
}

impl EngineSelection {
    pub fn resolve(args: &EngineArgs, config: &Config) -> Self {
        Self {
            binary: args
                .docker_binary
                .clone()
                .unwrap_or_else(|| config.engine.binary.clone()),
            docker_dir: args
                .docker_dir
                .clone()
                .unwrap_or_else(|| config.engine.docker_dir.clone()),
            namespace: args
                .namespace
                .clone()
                .unwrap_or_else(|| config.engine.namespace.clone()),
        }
    }

    pub fn engine(&self) -> Arc<DockerCli> {
        Arc::new(DockerCli::new(self.binary.clone()))
    }
}

/// Flag-over-config bucket resolution; empty means no destination
pub(crate) fn resolve_bucket(flag: &Option<String>, config: &Config) -> String {
    flag.clone().unwrap_or_else(|| config.cache.bucket.clone())
}

/// Store handle for a bucket, or None for the local-only case
pub(crate) fn store_for(bucket: &str) -> Option<Arc<dyn ObjectStore>> {
    if bucket.is_empty() {
        None
    } else {
        Some(Arc::new(S3CliStore::new(bucket)))
    }
}

/// Requested platforms, or every discovered one when none are named
pub(crate) fn resolve_platform_names(
    requested: &[String],
    docker_dir: &std::path::Path,
) -> StrataResult<Vec<String>> {
    if requested.is_empty() {
        platform::available_platforms(docker_dir)
    } else {
        Ok(requested.to_vec())
    }
}
