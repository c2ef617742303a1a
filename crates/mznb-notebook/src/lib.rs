//! Notebook sessions for MiniZinc models.
//!
//! A [`Session`] plays the part of a notebook kernel: it owns the interactive
//! namespace, the named-model registry and the loaded toolchain, and exposes
//! the two commands a notebook calls, `%minizinc` and `%%mzn_model`.
//! [`script`] runs the same commands from a plain-text `.mznb` file.

pub mod magic;
pub mod script;

#[cfg(test)]
mod test_support;

use mznb_core::{
    bind_solution, Diagnostics, ModelRegistry, ModelSource, MznError, MznResult, MznbConfig,
    Namespace, Orchestrator, ProcessRunner, SolutionMode, StageRunner, Statistics, Toolchain,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use magic::{MinizincArgs, ModeArg};
pub use script::{parse_script, CellRun, ScriptItem};

/// What one cell produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellOutput {
    /// The cell's value; `None` for errors, bind mode and "no solution".
    pub value: Option<Value>,
    /// Lines printed by the cell, in order.
    pub stdout: Vec<String>,
    pub statistics: Option<Statistics>,
    /// The cell printed an error instead of completing.
    pub failed: bool,
}

impl CellOutput {
    fn failure(line: impl Into<String>) -> Self {
        Self {
            stdout: vec![line.into()],
            failed: true,
            ..Self::default()
        }
    }
}

/// One interactive session.
pub struct Session<N: Namespace = BTreeMap<String, Value>> {
    namespace: N,
    registry: ModelRegistry,
    toolchain: Toolchain,
    runner: Box<dyn StageRunner>,
    default_solver: String,
    version: String,
}

impl Session {
    /// Detect the configured toolchain and check that it runs.
    ///
    /// Fails with [`MznError::ToolchainMissing`] when no session can work.
    pub fn load(config: &MznbConfig) -> MznResult<Self> {
        let toolchain = Toolchain::detect(&config.toolchain)?;
        Session::start(toolchain, Box::new(ProcessRunner), BTreeMap::new())
            .map(|s| s.with_default_solver(&config.toolchain.default_solver))
    }
}

impl<N: Namespace> Session<N> {
    /// Start a session over `namespace`, probing the toolchain through `runner`.
    pub fn start(toolchain: Toolchain, runner: Box<dyn StageRunner>, namespace: N) -> MznResult<Self> {
        let version = toolchain.version(runner.as_ref())?;
        info!(%version, "toolchain ready");
        Ok(Self {
            namespace,
            registry: ModelRegistry::new(),
            toolchain,
            runner,
            default_solver: "gecode".to_string(),
            version,
        })
    }

    pub fn with_default_solver(mut self, solver: &str) -> Self {
        self.default_solver = solver.to_string();
        self
    }

    /// First line of the toolchain's `--version` output.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut N {
        &mut self.namespace
    }

    pub fn into_namespace(self) -> N {
        self.namespace
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// `%minizinc` (line form, `cell` is `None`) and `%%minizinc`.
    ///
    /// Request, stage and binding errors are printed into the output. Only
    /// an undecodable solution stream is returned as an error.
    pub fn minizinc(&mut self, line: &str, cell: Option<&str>) -> MznResult<CellOutput> {
        match MinizincArgs::parse_line(line) {
            Ok(args) => self.minizinc_with(args, cell),
            Err(e) => Ok(CellOutput::failure(e.to_string())),
        }
    }

    /// [`Session::minizinc`] with arguments that are already parsed.
    pub fn minizinc_with(&mut self, args: MinizincArgs, cell: Option<&str>) -> MznResult<CellOutput> {
        let request = match args.into_request(&self.default_solver) {
            Ok(request) => request,
            Err(e) => return Ok(CellOutput::failure(e.to_string())),
        };

        let source = ModelSource::assemble(&request.models, cell, &mut self.registry);
        let mut diagnostics = Diagnostics::new();
        let result = Orchestrator::new(&self.toolchain, self.runner.as_ref()).solve(
            &request,
            &source,
            &self.namespace,
            &mut diagnostics,
        );

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_protocol_failure() => return Err(e),
            Err(e) => {
                let mut stdout = diagnostics.into_lines();
                stdout.push(e.to_string());
                return Ok(CellOutput {
                    stdout,
                    failed: true,
                    ..CellOutput::default()
                });
            }
        };

        let mut stdout = diagnostics.into_lines();
        let commentary: Vec<String> = outcome
            .commentary
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();
        if !commentary.is_empty() {
            stdout.push("Solver output:".to_string());
            stdout.extend(commentary);
        }

        let value = match request.solution_mode {
            SolutionMode::Return => outcome.selection.into_value(),
            SolutionMode::Bind => {
                match outcome.selection.last() {
                    Some(solution) => stdout.extend(bind_solution(
                        solution,
                        &mut self.namespace,
                        request.verbose,
                    )),
                    None => stdout.push("No solutions found".to_string()),
                }
                None
            }
        };

        Ok(CellOutput {
            value,
            stdout,
            statistics: outcome.statistics,
            failed: false,
        })
    }

    /// `%%mzn_model <name>`: store the cell body under exactly one name.
    pub fn mzn_model(&mut self, line: &str, cell: &str) -> MznResult<CellOutput> {
        let names = match shell_words::split(line) {
            Ok(names) => names,
            Err(e) => {
                let err = MznError::InvalidRequest(format!("Failed to parse arguments: {}", e));
                return Ok(CellOutput::failure(err.to_string()));
            }
        };

        match names.as_slice() {
            [] => Ok(CellOutput::failure("No model name provided")),
            [name] => {
                debug!(model = %name, "defining named model");
                self.registry.define(name.clone(), cell);
                Ok(CellOutput::default())
            }
            _ => Ok(CellOutput::failure("Multiple model names provided")),
        }
    }
}
