//! Load command - prime local engine state from the remote cache

use super::{resolve_bucket, resolve_platform_names, store_for, EngineSelection};
use crate::cli::args::TransferArgs;
use crate::config::Config;
use crate::error::{StrataError, StrataResult};
use crate::platform::resolve_tag;
use crate::remote::RemoteCache;
use crate::ui;

/// Execute the load command
pub async fn execute(args: TransferArgs, config: &Config) -> StrataResult<()> {
    let selection = EngineSelection::resolve(&args.engine, config);
    let bucket = resolve_bucket(&args.bucket, config);

    let platforms = resolve_platform_names(&args.platforms, &selection.docker_dir)?;
    let tags = platforms
        .iter()
        .map(|p| resolve_tag(&selection.namespace, p))
        .collect::<StrataResult<Vec<_>>>()?;

    let Some(store) = store_for(&bucket) else {
        // No destination: every tag is a miss, nothing is transferred.
        for tag in &tags {
            ui::step_warn(&format!("{tag}: no cache bucket configured"));
        }
        return Ok(());
    };

    let pb = ui::spinner(&format!("Loading {} tag(s) from {}", tags.len(), bucket));
    let cache = RemoteCache::new(selection.engine(), store);
    let report = cache.load(&tags).await;
    pb.finish_and_clear();

    for tag in &report.loaded {
        ui::step_ok(&format!("{tag}: loaded"));
    }
    for tag in &report.missed {
        ui::step_warn(&format!("{tag}: no remote archive"));
    }
    for (tag, reason) in &report.failed {
        ui::step_error(&format!("{tag}: {reason}"));
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(StrataError::BatchFailed {
            failed: report.failed.len(),
            total: tags.len(),
        })
    }
}
