//! Drives one solve invocation end to end.

use crate::bindings::{resolve_bindings, ModelInterface, Namespace};
use crate::decode::{decode_solutions, Selection};
use crate::diagnostics::Diagnostics;
use crate::error::MznResult;
use crate::pipeline::{run_stage, Plan, Workspace};
use crate::request::{ModelSource, SolveRequest};
use crate::stats::{parse_statistics, Statistics};
use crate::subprocess::StageRunner;
use crate::toolchain::Toolchain;
use std::fs;
use tracing::{debug, info};

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub selection: Selection,
    /// Solver commentary in emission order, minus lines consumed as statistics.
    pub commentary: Vec<String>,
    /// Present only when statistics were requested.
    pub statistics: Option<Statistics>,
    pub interface: ModelInterface,
}

/// Runs the interface query, binding, solve and decode steps for a toolchain.
pub struct Orchestrator<'a> {
    toolchain: &'a Toolchain,
    runner: &'a dyn StageRunner,
}

impl<'a> Orchestrator<'a> {
    pub fn new(toolchain: &'a Toolchain, runner: &'a dyn StageRunner) -> Self {
        Self { toolchain, runner }
    }

    /// Solve `source` with inputs looked up in `namespace`.
    ///
    /// The namespace is only read here; binding a solution back is up to the
    /// caller. Every artifact lives in a workspace that is removed before
    /// this returns, on success and on every error path.
    pub fn solve(
        &self,
        request: &SolveRequest,
        source: &ModelSource,
        namespace: &dyn Namespace,
        diagnostics: &mut Diagnostics,
    ) -> MznResult<SolveOutcome> {
        let workspace = Workspace::new()?;
        fs::write(workspace.model_path(), &source.text)?;

        let plan = Plan {
            request,
            aux_models: &source.aux_models,
            workspace: &workspace,
        };
        let strategy = self.toolchain.strategy();

        let interface_output = run_stage(
            self.runner,
            &strategy.interface_command(&plan),
            diagnostics,
        )?;
        let interface = ModelInterface::parse(&interface_output.stdout)?;
        debug!(
            inputs = ?interface.input,
            outputs = ?interface.output,
            method = interface.method.as_deref().unwrap_or("unknown"),
            "model interface"
        );

        let bindings = resolve_bindings(&interface, namespace)?;
        let data = bindings.write_data_file(&workspace.data_path())?;

        info!(
            solver = %request.solver,
            generation = %strategy.generation(),
            bindings = bindings.len(),
            "solving"
        );
        let run = strategy.solve(&plan, data.as_deref(), self.runner, diagnostics)?;

        let decoded = decode_solutions(&run.output)?;
        debug!(solutions = decoded.solutions.len(), "decoded solver output");

        let (commentary, statistics) = if request.statistics {
            let report = parse_statistics(
                &request.solver.stats_backend(),
                &run.compiler_stderr,
                &decoded.commentary,
                &run.solver_stderr,
            );
            if let Some(notice) = report.notice {
                diagnostics.push(notice);
            }
            (report.leftover, Some(report.statistics))
        } else {
            (decoded.commentary, None)
        };

        Ok(SolveOutcome {
            selection: Selection::from_solutions(decoded.solutions, request.all_solutions),
            commentary,
            statistics,
            interface,
        })
    }
}
