//! External toolchain discovery.
//!
//! A toolchain is either the single combined `minizinc` driver or the older
//! three-binary chain (`mzn2fzn`, `fzn-<solver>`, `solns2out`). Which one a
//! session drives is decided once, when the toolchain is loaded.

use crate::config::ToolchainConfig;
use crate::error::{MznError, MznResult};
use crate::pipeline::{CombinedPipeline, LegacyPipeline, PipelineStrategy};
use crate::subprocess::{find_binary, Stage, StageCommand, StageRunner};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Toolchain generation, i.e. the pipeline shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainGeneration {
    /// One `minizinc` binary compiles, solves and prints JSON.
    Combined,
    /// Flatten, solve and reconstruct as three processes.
    Legacy,
}

impl std::fmt::Display for ToolchainGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolchainGeneration::Combined => write!(f, "combined"),
            ToolchainGeneration::Legacy => write!(f, "legacy"),
        }
    }
}

/// Resolved executables of a toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    Combined {
        minizinc: PathBuf,
    },
    Legacy {
        mzn2fzn: PathBuf,
        solns2out: PathBuf,
        /// Prefix searched for `fzn-<solver>` before PATH.
        home: Option<PathBuf>,
    },
}

impl Toolchain {
    pub fn combined(minizinc: impl Into<PathBuf>) -> Self {
        Toolchain::Combined {
            minizinc: minizinc.into(),
        }
    }

    pub fn legacy(mzn2fzn: impl Into<PathBuf>, solns2out: impl Into<PathBuf>) -> Self {
        Toolchain::Legacy {
            mzn2fzn: mzn2fzn.into(),
            solns2out: solns2out.into(),
            home: None,
        }
    }

    /// Select and resolve a toolchain from configuration.
    ///
    /// Without a configured generation the combined binary wins when it can
    /// be found; otherwise both legacy binaries must resolve.
    pub fn detect(config: &ToolchainConfig) -> MznResult<Self> {
        let home = config.home.as_deref();
        let resolve = |explicit: &Option<PathBuf>, name: &str| -> Option<PathBuf> {
            match explicit {
                Some(path) => Some(path.clone()),
                None => find_binary(name, home),
            }
        };

        let combined = || resolve(&config.minizinc, "minizinc").map(Toolchain::combined);
        let legacy = || {
            let mzn2fzn = resolve(&config.mzn2fzn, "mzn2fzn")?;
            let solns2out = resolve(&config.solns2out, "solns2out")?;
            Some(Toolchain::Legacy {
                mzn2fzn,
                solns2out,
                home: config.home.clone(),
            })
        };

        let found = match config.generation {
            Some(ToolchainGeneration::Combined) => combined(),
            Some(ToolchainGeneration::Legacy) => legacy(),
            None => combined().or_else(legacy),
        };

        let toolchain = found.ok_or_else(|| {
            MznError::ToolchainMissing(
                "cannot find minizinc (or mzn2fzn and solns2out). Make sure it is on the PATH."
                    .to_string(),
            )
        })?;
        info!(generation = %toolchain.generation(), program = %toolchain.driver().display(), "toolchain selected");
        Ok(toolchain)
    }

    pub fn generation(&self) -> ToolchainGeneration {
        match self {
            Toolchain::Combined { .. } => ToolchainGeneration::Combined,
            Toolchain::Legacy { .. } => ToolchainGeneration::Legacy,
        }
    }

    /// The executable that compiles models: `minizinc` or `mzn2fzn`.
    pub fn driver(&self) -> &Path {
        match self {
            Toolchain::Combined { minizinc } => minizinc,
            Toolchain::Legacy { mzn2fzn, .. } => mzn2fzn,
        }
    }

    /// Pipeline strategy for this generation.
    pub fn strategy(&self) -> Box<dyn PipelineStrategy> {
        match self {
            Toolchain::Combined { minizinc } => Box::new(CombinedPipeline::new(minizinc.clone())),
            Toolchain::Legacy {
                mzn2fzn,
                solns2out,
                home,
            } => Box::new(LegacyPipeline::new(
                mzn2fzn.clone(),
                solns2out.clone(),
                home.clone(),
            )),
        }
    }

    /// Run `<driver> --version` and return its first output line.
    ///
    /// This is the load-time check; failure means no session can be used.
    pub fn version(&self, runner: &dyn StageRunner) -> MznResult<String> {
        let program = self.driver();
        let unusable = || {
            MznError::ToolchainMissing(format!(
                "cannot run {}. Make sure it is on the PATH.",
                program.display()
            ))
        };

        let command = StageCommand::new(Stage::Probe, program).arg("--version");
        let output = runner.run(&command).map_err(|_| unusable())?;
        if !output.success() {
            return Err(unusable());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}
