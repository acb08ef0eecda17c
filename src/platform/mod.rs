//! Build platforms and tag resolution
//!
//! A platform is a named build target backed by a `Dockerfile.build.<name>`
//! in the docker directory. Its image tag is a pure function of the
//! namespace and platform name, so separate processes agree on the same
//! tag without shared state.

use crate::error::{StrataError, StrataResult};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default tag namespace prepended to every platform tag
pub const DEFAULT_NAMESPACE: &str = "strata";

/// Filename prefix for platform Dockerfiles
pub const DOCKERFILE_PREFIX: &str = "Dockerfile.build.";

/// A named build target with its Dockerfile and build context.
///
/// Immutable once located; the build context is always the docker
/// directory itself so relative COPY instructions resolve the same way
/// on every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Validated platform name
    pub name: String,
    /// Path to `Dockerfile.build.<name>`
    pub dockerfile: PathBuf,
    /// Build context directory
    pub context: PathBuf,
}

impl Platform {
    /// Locate a platform's Dockerfile under the docker directory.
    ///
    /// Fails with a configuration error if the name is malformed or the
    /// Dockerfile does not exist. No build work happens before every
    /// platform in a request passes this check.
    pub fn locate(docker_dir: &Path, name: &str) -> StrataResult<Self> {
        validate_name(name)?;

        if !docker_dir.is_dir() {
            return Err(StrataError::DockerDirNotFound(docker_dir.to_path_buf()));
        }

        let dockerfile = docker_dir.join(format!("{DOCKERFILE_PREFIX}{name}"));
        if !dockerfile.is_file() {
            return Err(StrataError::DockerfileNotFound {
                platform: name.to_string(),
                path: dockerfile,
            });
        }

        Ok(Self {
            name: name.to_string(),
            dockerfile,
            context: docker_dir.to_path_buf(),
        })
    }

    /// Resolve this platform's image tag under the given namespace.
    pub fn tag(&self, namespace: &str) -> String {
        // Name was validated in locate(), so this cannot fail.
        format!("{namespace}/build.{}", self.name)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Resolve the image tag for a platform name.
///
/// Pure function of (namespace, name): no network or disk I/O. Fails only
/// on malformed platform identifiers.
pub fn resolve_tag(namespace: &str, name: &str) -> StrataResult<String> {
    validate_name(name)?;
    Ok(format!("{namespace}/build.{name}"))
}

/// Validate a platform identifier.
///
/// Platform names become Docker tag components, so they are restricted to
/// lowercase alphanumerics plus `.`, `_`, `-`, starting alphanumeric.
fn validate_name(name: &str) -> StrataResult<()> {
    if name.is_empty() {
        return Err(StrataError::InvalidPlatformName {
            name: name.to_string(),
            reason: "empty".to_string(),
        });
    }

    if !name.chars().next().unwrap_or(' ').is_ascii_alphanumeric() {
        return Err(StrataError::InvalidPlatformName {
            name: name.to_string(),
            reason: "must start with a lowercase alphanumeric".to_string(),
        });
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')))
    {
        return Err(StrataError::InvalidPlatformName {
            name: name.to_string(),
            reason: format!("disallowed character '{bad}'"),
        });
    }

    Ok(())
}

/// List platforms available under the docker directory.
///
/// Scans for the `Dockerfile.build.<name>` naming convention and returns
/// the names sorted for stable output.
pub fn available_platforms(docker_dir: &Path) -> StrataResult<Vec<String>> {
    if !docker_dir.is_dir() {
        return Err(StrataError::DockerDirNotFound(docker_dir.to_path_buf()));
    }

    let mut names = Vec::new();
    let entries = std::fs::read_dir(docker_dir)
        .map_err(|e| StrataError::io(format!("reading {}", docker_dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| StrataError::io("reading docker directory entry", e))?;
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(name) = file_name.strip_prefix(DOCKERFILE_PREFIX) {
            if validate_name(name).is_ok() {
                names.push(name.to_string());
            } else {
                debug!("Skipping Dockerfile with invalid platform name: {file_name}");
            }
        }
    }

    names.sort();
    debug!("Discovered {} platforms", names.len());
    Ok(names)
}
