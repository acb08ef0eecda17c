//! Error types for Strata
//!
//! All modules use `StrataResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Strata operations
pub type StrataResult<T> = Result<T, StrataError>;

/// All errors that can occur in Strata
#[derive(Error, Debug)]
pub enum StrataError {
    // Environment errors
    #[error("Container engine not found: {binary}. Install Docker or pass --docker-binary.")]
    EngineNotFound { binary: String },

    #[error("Container engine too old: {found} (minimum {minimum})")]
    EngineTooOld { found: String, minimum: String },

    #[error("aws CLI not found. Install it or leave the cache bucket unset.")]
    AwsCliNotFound,

    // Configuration errors
    #[error("Invalid platform name: {name}: {reason}")]
    InvalidPlatformName { name: String, reason: String },

    #[error("Dockerfile not found for platform {platform}: {path}")]
    DockerfileNotFound { platform: String, path: PathBuf },

    #[error("Docker directory not found: {0}")]
    DockerDirNotFound(PathBuf),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown configuration key: {0}")]
    ConfigKeyUnknown(String),

    // Build errors
    #[error("Build failed for platform {platform}: {detail}")]
    BuildFailure { platform: String, detail: String },

    #[error("Build timed out for platform {platform} after {seconds}s")]
    BuildTimeout { platform: String, seconds: u64 },

    #[error("Batch failed: {failed} of {total} item(s) unsuccessful")]
    BatchFailed { failed: usize, total: usize },

    // Transfer errors
    #[error("Transfer failed for {key}: {reason}")]
    TransferFailure { key: String, reason: String },

    #[error("Corrupt cache archive {key}: {reason}")]
    ArchiveCorrupt { key: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a build failure for a platform
    pub fn build_failure(platform: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BuildFailure {
            platform: platform.into(),
            detail: detail.into(),
        }
    }

    /// Create a transfer failure for an object key
    pub fn transfer(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransferFailure {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is fatal before any build attempt
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlatformName { .. }
                | Self::DockerfileNotFound { .. }
                | Self::DockerDirNotFound(_)
                | Self::EngineNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::ConfigNotFound(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineNotFound { .. } => Some("Install Docker or pass --docker-binary"),
            Self::AwsCliNotFound => Some("Install the AWS CLI: https://aws.amazon.com/cli/"),
            Self::DockerDirNotFound(_) => Some("Pass --docker-dir or set engine.docker_dir"),
            Self::ConfigNotFound(_) => Some("Run: strata config init"),
            _ => None,
        }
    }
}
