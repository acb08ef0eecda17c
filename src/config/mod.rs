//! Configuration management for Strata

pub mod schema;

pub use schema::Config;

use crate::error::{StrataError, StrataResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project-local configuration filename
pub const LOCAL_CONFIG_NAME: &str = ".strata.toml";

/// Configuration keys accepted by `config set`
const KNOWN_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "engine.binary",
    "engine.docker_dir",
    "engine.namespace",
    "engine.min_version",
    "cache.bucket",
    "cache.load",
    "cache.jobs",
    "cache.build_timeout_secs",
];

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
            .join("config.toml")
    }

    /// Walk up from `start` looking for a project-local config file
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(LOCAL_CONFIG_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> StrataResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> StrataResult<Config> {
        let value = Self::read_value(path).await?;
        value.try_into().map_err(|e: toml::de::Error| {
            StrataError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    /// Load the global config and overlay a project-local file on top
    pub async fn load_merged(&self, local: Option<&Path>) -> StrataResult<Config> {
        let mut value = if self.config_path.exists() {
            Self::read_value(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        if let Some(local_path) = local {
            let overlay = Self::read_value(local_path).await?;
            merge_values(&mut value, overlay);
        }

        value.try_into().map_err(|e: toml::de::Error| {
            StrataError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: e.to_string(),
            }
        })
    }

    async fn read_value(path: &Path) -> StrataResult<toml::Value> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StrataError::io(format!("reading config from {}", path.display()), e))?;

        content.parse().map_err(|e: toml::de::Error| {
            StrataError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> StrataResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            StrataError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set one key in the config file, preserving its layout.
    ///
    /// The file is edited in place (or created) rather than re-serialized
    /// so hand-written comments and ordering survive.
    pub async fn set_value(&self, key: &str, raw: &str) -> StrataResult<()> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(StrataError::ConfigKeyUnknown(key.to_string()));
        }
        let (section, field) = key.split_once('.').expect("known keys are dotted");

        self.ensure_config_dir().await?;

        let content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)
                .await
                .map_err(|e| StrataError::io("reading config", e))?
        } else {
            String::new()
        };

        let mut doc: toml_edit::DocumentMut =
            content
                .parse()
                .map_err(|e: toml_edit::TomlError| StrataError::ConfigInvalid {
                    path: self.config_path.clone(),
                    reason: e.to_string(),
                })?;

        doc[section][field] = parse_literal(raw);

        fs::write(&self.config_path, doc.to_string())
            .await
            .map_err(|e| StrataError::io("writing config", e))?;

        info!("Set {} = {}", key, raw);
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> StrataResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StrataError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a raw CLI value as bool or integer where it parses as one
fn parse_literal(raw: &str) -> toml_edit::Item {
    if let Ok(b) = raw.parse::<bool>() {
        toml_edit::value(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        toml_edit::value(n)
    } else {
        toml_edit::value(raw)
    }
}

/// Recursively overlay `overlay` onto `base`; overlay wins on conflicts
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => merge_values(base_value, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.engine.binary, "docker");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.bucket = "ci-layer-cache".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.bucket, "ci-layer-cache");
    }

    #[tokio::test]
    async fn local_config_overlays_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        let local = temp.path().join(LOCAL_CONFIG_NAME);

        tokio::fs::write(&global, "[cache]\nbucket = \"global-bucket\"\njobs = 2\n")
            .await
            .unwrap();
        tokio::fs::write(&local, "[cache]\nbucket = \"local-bucket\"\n")
            .await
            .unwrap();

        let manager = ConfigManager::with_path(global);
        let config = manager.load_merged(Some(&local)).await.unwrap();

        assert_eq!(config.cache.bucket, "local-bucket");
        assert_eq!(config.cache.jobs, 2); // untouched global key survives
    }

    #[tokio::test]
    async fn find_local_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(temp.path().join(LOCAL_CONFIG_NAME), "")
            .await
            .unwrap();

        let found = ConfigManager::find_local_config(&nested).unwrap();
        assert_eq!(found, temp.path().join(LOCAL_CONFIG_NAME));
    }

    #[tokio::test]
    async fn set_value_creates_and_types() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        manager.set_value("cache.bucket", "ci-cache").await.unwrap();
        manager.set_value("cache.load", "true").await.unwrap();
        manager.set_value("cache.jobs", "8").await.unwrap();

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.bucket, "ci-cache");
        assert!(config.cache.load);
        assert_eq!(config.cache.jobs, 8);
    }

    #[tokio::test]
    async fn set_value_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        let err = manager.set_value("cache.nope", "x").await.unwrap_err();
        assert!(matches!(err, StrataError::ConfigKeyUnknown(_)));
    }
}
