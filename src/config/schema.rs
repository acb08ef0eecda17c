//! Configuration schema for Strata
//!
//! Configuration is stored at `~/.config/strata/config.toml`; a
//! project-local `.strata.toml` overlays it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container engine settings
    pub engine: EngineConfig,

    /// Remote cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Container engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary to invoke
    pub binary: String,

    /// Directory holding `Dockerfile.build.<platform>` files
    pub docker_dir: PathBuf,

    /// Tag namespace prepended to platform tags
    pub namespace: String,

    /// Minimum supported engine version
    pub min_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            docker_dir: PathBuf::from("docker"),
            namespace: "strata".to_string(),
            min_version: "20.10.0".to_string(),
        }
    }
}

/// Remote cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// S3 bucket holding cache archives (empty = local-only)
    pub bucket: String,

    /// Load remote archives before building
    pub load: bool,

    /// Parallel build workers (0 = available parallelism)
    pub jobs: usize,

    /// Per-build timeout in seconds (0 = unbounded)
    pub build_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            load: false,
            jobs: 0,
            build_timeout_secs: 3600,
        }
    }
}
