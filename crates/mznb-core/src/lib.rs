//! Toolchain orchestration and solution decoding for MiniZinc notebook sessions.
//!
//! This crate drives an external MiniZinc toolchain as black-box executables
//! and turns what they print into structured values.
//!
//! # Architecture
//!
//! ```text
//! namespace ──bindings──> data.json ─┐
//! model text ──────────> model.mzn ──┼─> interface query ─> compile/solve stage(s)
//!                                    │                         │
//!                                    │        stdout (JSON fragments + % comments)
//!                                    │                         v
//!                                    └──────────────── decoder ─> solutions, statistics
//! ```
//!
//! Two toolchain generations are supported, each a [`pipeline::PipelineStrategy`]:
//!
//! | Generation | Stages |
//! |------------|--------|
//! | Combined   | `minizinc --output-mode json` |
//! | Legacy     | `mzn2fzn` → `fzn-<solver>` → `solns2out` |
//!
//! Nothing here performs constraint propagation or search; the crate only
//! orchestrates and parses.

pub mod bindings;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod request;
pub mod stats;
pub mod subprocess;
pub mod toolchain;

#[cfg(test)]
pub(crate) mod testing;

pub use bindings::{resolve_bindings, Bindings, ModelInterface, Namespace};
pub use config::MznbConfig;
pub use decode::{bind_solution, decode_solutions, partition_lines, Decoded, Selection, Solution};
pub use diagnostics::Diagnostics;
pub use error::{MznError, MznResult};
pub use orchestrator::{Orchestrator, SolveOutcome};
pub use pipeline::{CombinedPipeline, LegacyPipeline, PipelineStrategy, Plan, SolveRun, Workspace};
pub use registry::ModelRegistry;
pub use request::{ModelSource, SolutionMode, SolveRequest};
pub use stats::{StatValue, Statistics, StatsBackend};
pub use subprocess::{ProcessRunner, Stage, StageCommand, StageOutput, StageRunner};
pub use toolchain::{Toolchain, ToolchainGeneration};

/// Solver backends a solve request may name.
///
/// The identifier selects the `--solver` tag of the combined binary, the
/// FlatZinc executable of the legacy pipeline, and the statistics rules
/// applied to its diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverId {
    /// Gecode - generic constraint development environment.
    ///
    /// Propagation-based CP solver; the default backend.
    Gecode,

    /// Chuffed - lazy clause generation CP solver.
    Chuffed,

    /// CBC - COIN-OR Branch and Cut, reached through the linear library.
    Cbc,

    /// HiGHS - LP/MIP solver, reached through the linear library.
    Highs,
}

impl SolverId {
    /// Tag passed to `minizinc --solver`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverId::Gecode => "gecode",
            SolverId::Chuffed => "chuffed",
            SolverId::Cbc => "cbc",
            SolverId::Highs => "highs",
        }
    }

    /// Get the display name for this solver.
    pub fn display_name(&self) -> &'static str {
        match self {
            SolverId::Gecode => "Gecode",
            SolverId::Chuffed => "Chuffed",
            SolverId::Cbc => "COIN-BC",
            SolverId::Highs => "HiGHS",
        }
    }

    /// FlatZinc executable used by the legacy pipeline.
    pub fn fzn_binary(&self) -> &'static str {
        match self {
            SolverId::Gecode => "fzn-gecode",
            SolverId::Chuffed => "fzn-chuffed",
            SolverId::Cbc => "fzn-cbc",
            SolverId::Highs => "fzn-highs",
        }
    }

    /// Globals library directory handed to the legacy flattener via `-G`.
    pub fn globals_dir(&self) -> &'static str {
        match self {
            SolverId::Gecode => "gecode",
            SolverId::Chuffed => "chuffed",
            SolverId::Cbc | SolverId::Highs => "linear",
        }
    }

    /// Get a description of what this solver does.
    pub fn description(&self) -> &'static str {
        match self {
            SolverId::Gecode => "CP propagation and search",
            SolverId::Chuffed => "CP with lazy clause generation",
            SolverId::Cbc => "MIP branch-and-cut",
            SolverId::Highs => "LP/MIP high-performance",
        }
    }

    /// Statistics rules for this solver's diagnostic output.
    pub fn stats_backend(&self) -> StatsBackend {
        match self {
            SolverId::Gecode => StatsBackend::Gecode,
            SolverId::Cbc | SolverId::Highs => StatsBackend::Mip,
            SolverId::Chuffed => StatsBackend::Unsupported(self.as_str().to_string()),
        }
    }

    /// Get all known solver IDs.
    pub fn all() -> &'static [SolverId] {
        &[
            SolverId::Gecode,
            SolverId::Chuffed,
            SolverId::Cbc,
            SolverId::Highs,
        ]
    }
}

impl Default for SolverId {
    fn default() -> Self {
        SolverId::Gecode
    }
}

impl std::fmt::Display for SolverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SolverId {
    type Err = MznError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(MznError::EmptySolver);
        }
        match tag.to_lowercase().as_str() {
            "gecode" | "org.gecode.gecode" => Ok(SolverId::Gecode),
            "chuffed" | "org.chuffed.chuffed" => Ok(SolverId::Chuffed),
            "cbc" | "coin-bc" | "coinbc" | "osicbc" => Ok(SolverId::Cbc),
            "highs" => Ok(SolverId::Highs),
            _ => Err(MznError::UnknownSolver(tag.to_string())),
        }
    }
}
