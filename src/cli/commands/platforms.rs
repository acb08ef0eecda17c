//! Platforms command - list discovered build platforms

use super::EngineSelection;
use crate::cli::args::{OutputFormat, PlatformsArgs};
use crate::config::Config;
use crate::error::StrataResult;
use crate::platform::{available_platforms, resolve_tag};

/// Execute the platforms command
pub async fn execute(args: PlatformsArgs, config: &Config) -> StrataResult<()> {
    let selection = EngineSelection::resolve(&args.engine, config);
    let names = available_platforms(&selection.docker_dir)?;

    match args.format {
        OutputFormat::Plain => {
            for name in &names {
                println!("{name}");
            }
        }
        OutputFormat::Table => {
            println!("{:<24} {:<32}", "PLATFORM", "TAG");
            println!("{}", "-".repeat(56));
            for name in &names {
                println!("{:<24} {:<32}", name, resolve_tag(&selection.namespace, name)?);
            }
            println!();
            println!("Total: {} platform(s)", names.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
    }

    Ok(())
}
