//! Save command - upload locally built platform images

use super::{resolve_bucket, resolve_platform_names, store_for, EngineSelection};
use crate::cli::args::TransferArgs;
use crate::config::Config;
use crate::error::{StrataError, StrataResult};
use crate::platform::resolve_tag;
use crate::remote::RemoteCache;
use crate::ui;
use tracing::debug;

/// Execute the save command
pub async fn execute(args: TransferArgs, config: &Config) -> StrataResult<()> {
    let selection = EngineSelection::resolve(&args.engine, config);
    let bucket = resolve_bucket(&args.bucket, config);

    let platforms = resolve_platform_names(&args.platforms, &selection.docker_dir)?;
    let tags = platforms
        .iter()
        .map(|p| resolve_tag(&selection.namespace, p))
        .collect::<StrataResult<Vec<_>>>()?;

    let Some(store) = store_for(&bucket) else {
        // Empty destination is a local-only no-op, not an error.
        debug!("No cache bucket configured, save skipped");
        return Ok(());
    };

    let pb = ui::spinner(&format!("Saving {} tag(s) to {}", tags.len(), bucket));
    let cache = RemoteCache::new(selection.engine(), store);
    let report = cache.save(&tags).await;
    pb.finish_and_clear();

    for archive in &report.saved {
        ui::step_ok(&format!(
            "{}: {} ({} bytes, sha256:{})",
            archive.tag, archive.key, archive.bytes, archive.digest
        ));
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
