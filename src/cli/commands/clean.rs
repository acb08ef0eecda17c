//! Clean command - remove locally held platform images
//!
//! Used to force a cold node before a cache-correctness run, or to
//! reclaim disk after an upload so later cache-driven builds are not
//! contaminated by leftover local layers.

use super::{resolve_platform_names, EngineSelection};
use crate::cli::args::CleanArgs;
use crate::config::Config;
use crate::engine::ContainerEngine;
use crate::error::StrataResult;
use crate::platform::resolve_tag;
use crate::ui;

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> StrataResult<()> {
    let selection = EngineSelection::resolve(&args.engine, config);

    let platforms = if args.all {
        resolve_platform_names(&[], &selection.docker_dir)?
    } else {
        args.platforms.clone()
    };

    let engine = selection.engine();
    for name in &platforms {
        let tag = resolve_tag(&selection.namespace, name)?;
        // Idempotent: an absent tag is already clean.
        engine.remove_image(&tag).await?;
        ui::step_ok(&format!("{tag}: removed"));
    }

    Ok(())
}
