//! Solve request and model source assembly.
//!
//! Defines what one `%minizinc` invocation asks the toolchain to do.

use crate::registry::ModelRegistry;
use crate::SolverId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a successful solve hands its solution back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionMode {
    /// Return the selected solution(s) as the cell's value.
    #[default]
    Return,
    /// Assign every variable of the last solution into the namespace.
    Bind,
}

impl std::fmt::Display for SolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionMode::Return => write!(f, "return"),
            SolutionMode::Bind => write!(f, "bind"),
        }
    }
}

/// Realized options of one solve call.
///
/// Constructed fresh per call and never mutated once the pipeline starts;
/// it fully determines the shape of the stage commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Solver backend.
    pub solver: SolverId,

    /// Time limit in milliseconds, passed through to the toolchain.
    pub time_limit: Option<u64>,

    /// Ask the toolchain for verbose output and echo bound variables.
    pub verbose: bool,

    /// Collect and parse compiler/solver statistics.
    pub statistics: bool,

    /// Return every solution instead of the last one.
    pub all_solutions: bool,

    /// Return the solution or bind it into the namespace.
    pub solution_mode: SolutionMode,

    /// Named-model or model-file tokens, in command order.
    pub models: Vec<String>,

    /// Extra data files appended after the generated data artifact.
    pub data_files: Vec<PathBuf>,
}

impl Default for SolveRequest {
    fn default() -> Self {
        Self::new(SolverId::default())
    }
}

impl SolveRequest {
    /// A request with every flag off and no auxiliary files.
    pub fn new(solver: SolverId) -> Self {
        Self {
            solver,
            time_limit: None,
            verbose: false,
            statistics: false,
            all_solutions: false,
            solution_mode: SolutionMode::Return,
            models: Vec::new(),
            data_files: Vec::new(),
        }
    }

    pub fn with_time_limit(mut self, millis: u64) -> Self {
        self.time_limit = Some(millis);
        self
    }

    /// The limit handed to the toolchain; zero means no limit.
    pub fn effective_time_limit(&self) -> Option<u64> {
        self.time_limit.filter(|&millis| millis > 0)
    }

    pub fn with_statistics(mut self, statistics: bool) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_all_solutions(mut self, all: bool) -> Self {
        self.all_solutions = all;
        self
    }

    pub fn with_solution_mode(mut self, mode: SolutionMode) -> Self {
        self.solution_mode = mode;
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models.extend(models.into_iter().map(Into::into));
        self
    }

    pub fn with_data_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.data_files.extend(files.into_iter().map(Into::into));
        self
    }
}

/// Model text for the generated `model.mzn`, plus leftover model-file tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSource {
    pub text: String,
    /// Tokens with no registry entry; passed to the compiler as file paths.
    pub aux_models: Vec<String>,
}

impl ModelSource {
    /// Splice named models and the cell body into one source.
    ///
    /// Registered names are taken out of `registry` in token order. A token
    /// without a registry entry is left as an auxiliary model file; it is not
    /// reported as an error.
    pub fn assemble(tokens: &[String], cell: Option<&str>, registry: &mut ModelRegistry) -> Self {
        let mut source = ModelSource::default();

        for token in tokens {
            match registry.take(token) {
                Some(text) => source.append(&text),
                None => source.aux_models.push(token.clone()),
            }
        }

        if let Some(cell) = cell {
            source.append(cell);
        }

        source
    }

    fn append(&mut self, text: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }
}
