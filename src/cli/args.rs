//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strata - Docker layer-cache orchestration for CI
///
/// Pulls cached build-environment images from object storage, rebuilds
/// with Docker's own layer cache, and pushes updated archives back.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .strata.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build platforms, optionally priming from and saving to the cache
    Build(BuildArgs),

    /// Load platform archives from the remote cache into local state
    Load(TransferArgs),

    /// Save locally built platform images to the remote cache
    Save(TransferArgs),

    /// Remove locally held platform images
    Clean(CleanArgs),

    /// List platforms discovered in the docker directory
    Platforms(PlatformsArgs),

    /// Check engine and cache prerequisites
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Shared engine selection flags
#[derive(Parser, Debug)]
pub struct EngineArgs {
    /// Container engine binary
    #[arg(long, env = "STRATA_DOCKER_BINARY")]
    pub docker_binary: Option<String>,

    /// Directory holding Dockerfile.build.<platform> files
    #[arg(long)]
    pub docker_dir: Option<PathBuf>,

    /// Tag namespace (registry prefix) for platform tags
    #[arg(long)]
    pub namespace: Option<String>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Platforms to build (defaults to all discovered)
    pub platforms: Vec<String>,

    /// S3 bucket for cache archives (empty = no upload/download)
    #[arg(short, long, env = "STRATA_BUCKET")]
    pub bucket: Option<String>,

    /// Prime local state from the remote cache before building
    #[arg(long)]
    pub load_cache: bool,

    /// Parallel build workers (0 = available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-build timeout in seconds (0 = unbounded)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Suppress raw build output (summary table still prints)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format for the batch report
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the load and save commands
#[derive(Parser, Debug)]
pub struct TransferArgs {
    /// Platforms to transfer (defaults to all discovered)
    pub platforms: Vec<String>,

    /// S3 bucket for cache archives
    #[arg(short, long, env = "STRATA_BUCKET")]
    pub bucket: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Platforms whose local images to remove
    #[arg(required_unless_present = "all")]
    pub platforms: Vec<String>,

    /// Remove local images for every discovered platform
    #[arg(long, conflicts_with = "platforms")]
    pub all: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the platforms command
#[derive(Parser, Debug)]
pub struct PlatformsArgs {
    /// Output format
    #[arg(long, default_value = "plain")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.bucket)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for reports and listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
