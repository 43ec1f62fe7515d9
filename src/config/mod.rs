//! Configuration file handling
//!
//! buildctl reads one TOML file. Its location is `--config` or
//! `BUILDCTL_CONFIG` when given, otherwise `buildctl/config.toml` under the
//! user config directory. A missing file means built-in defaults; nothing
//! is written until `config init` or `config set`.

pub mod schema;

pub use schema::Config;

use crate::error::{BuildError, BuildResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Loads and stores the buildctl config file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `path` when given, the per-user location otherwise
    pub fn resolve(path: Option<PathBuf>) -> Self {
        Self {
            config_path: path.unwrap_or_else(Self::default_config_path),
        }
    }

    /// Use an explicit config file
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/buildctl/config.toml`, relative to the working
    /// directory when no config dir is known
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildctl")
            .join("config.toml")
    }

    /// Read and validate the config. A missing file yields defaults.
    pub async fn load(&self) -> BuildResult<Config> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(BuildError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        let config: Config = toml::from_str(&content).map_err(|e| self.invalid(e.to_string()))?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Write the config, replacing the file in one rename
    pub async fn save(&self, config: &Config) -> BuildResult<()> {
        self.validate(config)?;

        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let staging = self.config_path.with_extension("toml.tmp");
        let content = toml::to_string_pretty(config)?;
        fs::write(&staging, content)
            .await
            .map_err(|e| BuildError::io(format!("writing {}", staging.display()), e))?;
        fs::rename(&staging, &self.config_path).await.map_err(|e| {
            BuildError::io(format!("replacing {}", self.config_path.display()), e)
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Whether the config file is present
    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn validate(&self, config: &Config) -> BuildResult<()> {
        if config.progress.queue_capacity == 0 {
            return Err(self.invalid("progress.queue_capacity must be at least 1".to_string()));
        }
        let format = config.general.log_format.to_ascii_lowercase();
        if format != "text" && format != "json" {
            return Err(self.invalid(format!(
                "general.log_format must be text or json, got {}",
                config.general.log_format
            )));
        }
        if config.engine.command.trim().is_empty() {
            return Err(self.invalid("engine.command must not be empty".to_string()));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> BuildError {
        BuildError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.engine.command, "buildkit-solve");
        assert!(!manager.exists());
    }

    #[test]
    fn override_wins_over_default_location() {
        let manager = ConfigManager::resolve(Some(PathBuf::from("/etc/buildctl.toml")));
        assert_eq!(manager.path(), Path::new("/etc/buildctl.toml"));

        let manager = ConfigManager::resolve(None);
        assert!(manager.path().ends_with("buildctl/config.toml"));
    }

    #[tokio::test]
    async fn save_creates_parent_and_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path.clone());

        let mut config = Config::default();
        config.engine.addr = Some("tcp://127.0.0.1:1234".to_string());
        manager.save(&config).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.engine.addr.as_deref(), Some("tcp://127.0.0.1:1234"));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    async fn unparsable_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[progress]\nmode = \"fancy\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, BuildError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[tokio::test]
    async fn zero_queue_capacity_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[progress]\nqueue_capacity = 0\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[tokio::test]
    async fn save_refuses_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = Config::default();
        config.general.log_format = "xml".to_string();

        assert!(ConfigManager::with_path(path.clone()).save(&config).await.is_err());
        assert!(!path.exists());
    }
}
