//! Argument surface of the `%minizinc` command.

use clap::{Parser, ValueEnum};
use mznb_core::{MznError, MznResult, SolutionMode, SolveRequest, SolverId};
use std::path::PathBuf;

/// How the solution is handed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Return the solution as the cell value
    #[default]
    Return,
    /// Assign the solution's variables in the namespace
    Bind,
}

impl From<ModeArg> for SolutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Return => SolutionMode::Return,
            ModeArg::Bind => SolutionMode::Bind,
        }
    }
}

/// Flags of `%minizinc` / `%%minizinc`, shared with `mznb solve`.
///
/// `--data` takes every following value, so model tokens go before it.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "%minizinc", about = "Solve a MiniZinc model")]
pub struct MinizincArgs {
    /// Verbose toolchain output; echo bound variables
    #[arg(short, long)]
    pub verbose: bool,

    /// Collect compiler and solver statistics
    #[arg(short, long)]
    pub statistics: bool,

    /// Return the solution or bind it into the namespace
    #[arg(short = 'm', long, value_enum, default_value_t = ModeArg::Return)]
    pub solution_mode: ModeArg,

    /// Return all solutions instead of the last one
    #[arg(short, long)]
    pub all_solutions: bool,

    /// Time limit in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub time_limit: Option<u64>,

    /// Solver to use (gecode, chuffed, cbc, highs)
    #[arg(long)]
    pub solver: Option<String>,

    /// Extra data files
    #[arg(long, num_args = 1.., value_name = "FILE")]
    pub data: Vec<PathBuf>,

    /// Named models or model files
    #[arg(value_name = "MODEL")]
    pub model: Vec<String>,
}

impl MinizincArgs {
    /// Split a magic line with shell quoting rules and parse it.
    pub fn parse_line(line: &str) -> MznResult<Self> {
        let words = shell_words::split(line).map_err(|e| {
            MznError::InvalidRequest(format!("Failed to parse arguments: {}", e))
        })?;
        let argv = std::iter::once("%minizinc".to_string()).chain(words);
        Self::try_parse_from(argv)
            .map_err(|e| MznError::InvalidRequest(e.to_string().trim_end().to_string()))
    }

    /// Realize the request; the solver is validated before anything runs.
    pub fn into_request(self, default_solver: &str) -> MznResult<SolveRequest> {
        let solver: SolverId = self.solver.as_deref().unwrap_or(default_solver).parse()?;
        let mut request = SolveRequest::new(solver)
            .with_statistics(self.statistics)
            .with_all_solutions(self.all_solutions)
            .with_solution_mode(self.solution_mode.into())
            .with_models(self.model)
            .with_data_files(self.data);
        request.verbose = self.verbose;
        if let Some(limit) = self.time_limit {
            request = request.with_time_limit(limit);
        }
        Ok(request)
    }
}
