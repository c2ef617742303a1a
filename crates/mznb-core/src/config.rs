//! Configuration for notebook sessions and the `mznb` binary.
//!
//! Stored in `~/.mznb/config.toml`. Partial files are fine; every missing
//! value falls back to its default.

use crate::error::MznResult;
use crate::toolchain::ToolchainGeneration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MznbConfig {
    /// Toolchain discovery.
    pub toolchain: ToolchainConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where the external executables live and which generation to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Force a generation instead of detecting one.
    pub generation: Option<ToolchainGeneration>,
    /// Installation prefix searched as `<home>/bin` before PATH.
    pub home: Option<PathBuf>,
    /// Explicit path to the combined `minizinc` binary.
    pub minizinc: Option<PathBuf>,
    /// Explicit path to the legacy flattener.
    pub mzn2fzn: Option<PathBuf>,
    /// Explicit path to the legacy solution reconstructor.
    pub solns2out: Option<PathBuf>,
    /// Solver used when a command names none.
    pub default_solver: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            generation: None,
            home: None,
            minizinc: None,
            mzn2fzn: None,
            solns2out: None,
            default_solver: default_solver(),
        }
    }
}

fn default_solver() -> String {
    "gecode".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl MznbConfig {
    /// Get the default config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".mznb"))
    }

    /// Get the default config file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load configuration from the default location.
    ///
    /// Returns default config if file doesn't exist.
    pub fn load() -> MznResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> MznResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> MznResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
