//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::StrataResult;
use crate::ui;

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> StrataResult<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", manager.path().display());
            Ok(())
        }
        ConfigAction::Init { force } => {
            if manager.path().exists() && !force {
                ui::step_warn(&format!(
                    "{} already exists (use --force to overwrite)",
                    manager.path().display()
                ));
                return Ok(());
            }
            manager.save(&Config::default()).await?;
            ui::step_ok(&format!("Wrote {}", manager.path().display()));
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            manager.set_value(&key, &value).await?;
            ui::step_ok(&format!("{key} = {value}"));
            Ok(())
        }
    }
}
