//! Status command - check engine and cache prerequisites

use crate::config::Config;
use crate::engine::{ContainerEngine, DockerCli};
use crate::error::{StrataError, StrataResult};
use crate::ui;
use semver::Version;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Execute the status command
pub async fn execute(config: &Config) -> StrataResult<()> {
    ui::section("Strata Status");

    let engine = DockerCli::new(config.engine.binary.clone());

    if !engine.is_available().await {
        ui::step_error(&format!("engine binary not found: {}", config.engine.binary));
        return Err(StrataError::EngineNotFound {
            binary: config.engine.binary.clone(),
        });
    }
    ui::step_ok(&format!("engine binary: {}", config.engine.binary));

    check_engine_version(&engine, &config.engine.min_version).await?;

    if config.engine.docker_dir.is_dir() {
        ui::step_ok(&format!(
            "docker directory: {}",
            config.engine.docker_dir.display()
        ));
    } else {
        ui::step_warn(&format!(
            "docker directory missing: {}",
            config.engine.docker_dir.display()
        ));
    }

    if config.cache.bucket.is_empty() {
        ui::key_value("cache bucket", "(unset, local-only)");
    } else if aws_cli_available().await {
        ui::step_ok(&format!("cache bucket: s3://{}", config.cache.bucket));
    } else {
        ui::step_error("aws CLI not found but a cache bucket is configured");
        return Err(StrataError::AwsCliNotFound);
    }

    Ok(())
}

async fn check_engine_version(engine: &DockerCli, minimum: &str) -> StrataResult<()> {
    let version = match engine.version().await {
        Ok(v) => v,
        Err(e) => {
            debug!("Engine version probe failed: {}", e);
            ui::step_warn("engine version: unknown");
            return Ok(());
        }
    };

    let (Ok(found), Ok(min)) = (Version::parse(&version), Version::parse(minimum)) else {
        ui::step_warn(&format!("engine version: {version} (unparseable, check skipped)"));
        return Ok(());
    };

    if found < min {
        ui::step_error(&format!("engine version: {found} (minimum {min})"));
        return Err(StrataError::EngineTooOld {
            found: found.to_string(),
            minimum: min.to_string(),
        });
    }

    ui::step_ok(&format!("engine version: {found}"));
    Ok(())
}

async fn aws_cli_available() -> bool {
    Command::new("aws")
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
