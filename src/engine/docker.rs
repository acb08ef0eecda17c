//! Docker CLI engine
//!
//! Implements the ContainerEngine trait by driving a docker-compatible
//! binary. The binary path is configurable so CI hosts can point at a
//! wrapper or an alternative engine with the same CLI surface.

use crate::engine::{build_error_output, runtime::ContainerEngine, stream_child_output};
use crate::error::{StrataError, StrataResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Container engine backed by the docker command line
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    /// Create an engine handle for the given binary path
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[&str]) -> StrataResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))
    }

    fn spawn_error(&self, args: &[&str], source: std::io::Error) -> StrataError {
        if source.kind() == std::io::ErrorKind::NotFound {
            StrataError::EngineNotFound {
                binary: self.binary.clone(),
            }
        } else {
            StrataError::command_failed(format!("{} {:?}", self.binary, args), source)
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn build(
        &self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
        on_output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> StrataResult<()> {
        info!("Building {} from {}", tag, dockerfile.display());

        let mut child = Command::new(&self.binary)
            // The classic builder's output is the cache signal the
            // observer classifies; BuildKit prints a different dialect.
            .env("DOCKER_BUILDKIT", "0")
            .arg("build")
            .arg("--file")
            .arg(dockerfile)
            .arg("--tag")
            .arg(tag)
            .arg(context)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(&["build"], e))?;

        let output = stream_child_output(&mut child, on_output).await;

        let status = child
            .wait()
            .await
            .map_err(|e| StrataError::command_failed(format!("{} build", self.binary), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(StrataError::BuildFailure {
                platform: tag.to_string(),
                detail: build_error_output(&output),
            })
        }
    }

    async fn image_exists(&self, tag: &str) -> StrataResult<bool> {
        let output = self.exec(&["image", "inspect", tag]).await?;
        Ok(output.status.success())
    }

    async fn remove_image(&self, tag: &str) -> StrataResult<()> {
        debug!("Removing local image: {}", tag);

        let output = self.exec(&["rmi", "--force", tag]).await?;

        if output.status.success() {
            return Ok(());
        }

        // Deleting an absent tag is a no-op, not an error.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("no such image") {
            debug!("Image {} already absent", tag);
            Ok(())
        } else {
            Err(StrataError::command_exec(
                format!("{} rmi", self.binary),
                stderr,
            ))
        }
    }

    async fn export_image(&self, tag: &str, dest: &Path) -> StrataResult<()> {
        debug!("Exporting {} to {}", tag, dest.display());

        let dest_str = dest.to_string_lossy();
        let output = self
            .exec(&["save", "--output", dest_str.as_ref(), tag])
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StrataError::command_exec(
                format!("{} save {}", self.binary, tag),
                stderr,
            ))
        }
    }

    async fn import_image(&self, src: &Path) -> StrataResult<()> {
        debug!("Importing image archive {}", src.display());

        let src_str = src.to_string_lossy();
        let output = self.exec(&["load", "--input", src_str.as_ref()]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StrataError::command_exec(
                format!("{} load", self.binary),
                stderr,
            ))
        }
    }

    async fn version(&self) -> StrataResult<String> {
        let output = self
            .exec(&["version", "--format", "{{.Client.Version}}"])
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StrataError::command_exec(
                format!("{} version", self.binary),
                stderr,
            ))
        }
    }

    fn engine_name(&self) -> &'static str {
        "Docker"
    }
}
