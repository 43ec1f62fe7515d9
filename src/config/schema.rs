//! Configuration schema for buildctl
//!
//! Configuration is stored at `~/.config/buildctl/config.toml`

use crate::ui::ProgressMode;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Build engine settings
    pub engine: EngineConfig,

    /// Progress display settings
    pub progress: ProgressConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Build engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable that speaks the solve line protocol
    pub command: String,

    /// Extra arguments passed before `--addr`
    pub args: Vec<String>,

    /// Engine address, overridden by `--addr`
    pub addr: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "buildkit-solve".to_string(),
            args: vec![],
            addr: None,
        }
    }
}

/// Progress display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Default mode when `--progress` is not given
    pub mode: ProgressMode,

    /// Bounded size of each consumer's status queue
    pub queue_capacity: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Auto,
            queue_capacity: 16,
        }
    }
}
