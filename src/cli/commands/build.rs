//! Build command - orchestrate load, build, and save for a platform set

use super::{resolve_bucket, resolve_platform_names, store_for, EngineSelection};
use crate::cli::args::{BuildArgs, OutputFormat};
use crate::config::Config;
use crate::error::{StrataError, StrataResult};
use crate::orchestrator::{BuildRequest, Orchestrator};
use crate::ui;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> StrataResult<()> {
    let selection = EngineSelection::resolve(&args.engine, config);
    let bucket = resolve_bucket(&args.bucket, config);

    let platforms = resolve_platform_names(&args.platforms, &selection.docker_dir)?;
    if platforms.is_empty() {
        ui::step_warn(&format!(
            "No platforms found under {}",
            selection.docker_dir.display()
        ));
        return Ok(());
    }

    let timeout_secs = args.timeout_secs.unwrap_or(config.cache.build_timeout_secs);

    let mut request = BuildRequest::new(platforms, selection.docker_dir.clone());
    request.namespace = selection.namespace.clone();
    request.load_cache = args.load_cache || config.cache.load;
    request.jobs = args.jobs.unwrap_or(config.cache.jobs);
    request.build_timeout = (timeout_secs != 0).then(|| Duration::from_secs(timeout_secs));
    request.echo_output = !args.quiet;

    if request.load_cache && bucket.is_empty() {
        debug!("Cache loading requested but no bucket configured");
    }

    // First Ctrl-C cancels platforms that have not started; in-flight
    // builds finish and are reported.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested, finishing in-flight builds");
            let _ = cancel_tx.send(true);
        }
    });

    let orchestrator = Orchestrator::new(selection.engine(), store_for(&bucket));
    let report = orchestrator
        .build_save_containers(&request, Some(cancel_rx))
        .await?;

    match args.format {
        OutputFormat::Table => ui::print_batch_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for outcome in &report.outcomes {
                println!("{} {}", outcome.platform, outcome.state);
            }
        }
    }

    if report.succeeded() {
        Ok(())
    } else {
        Err(StrataError::BatchFailed {
            failed: report.failed_platforms().len(),
            total: report.outcomes.len(),
        })
    }
}
