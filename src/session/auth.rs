//! Registry credential provider

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Points the engine at the docker-style registry credentials file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthProvider {
    config_path: PathBuf,
}

impl AuthProvider {
    /// Locate the credentials file from `DOCKER_CONFIG` or `~/.docker`
    pub fn from_env() -> Self {
        let dir = std::env::var_os("DOCKER_CONFIG")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".docker")
            });
        Self::with_config_path(dir.join("config.json"))
    }

    /// Use an explicit credentials file
    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Path of the credentials file (it may not exist)
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
