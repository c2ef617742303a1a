//! Pipeline strategies, one per toolchain generation.
//!
//! A strategy only builds [`StageCommand`]s and sequences them; spawning is
//! left to the [`StageRunner`] it is handed. Argument lists can therefore be
//! checked without any toolchain installed.

use crate::diagnostics::Diagnostics;
use crate::error::MznResult;
use crate::request::SolveRequest;
use crate::subprocess::{find_binary, Stage, StageCommand, StageOutput, StageRunner};
use crate::toolchain::ToolchainGeneration;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Flags that make solution printing parser-friendly.
///
/// Infeasible and unknown outcomes are printed as comment lines; every other
/// boilerplate message and the solution separator are suppressed, and
/// consecutive solutions are joined by `,`.
pub const OUTPUT_SHAPING_ARGS: [&str; 14] = [
    "--unsat-msg",
    "% The problem is infeasible",
    "--unbounded-msg",
    "",
    "--unsatorunbnd-msg",
    "",
    "--unknown-msg",
    "% No solution has been found",
    "--search-complete-msg",
    "",
    "--solution-comma",
    ",",
    "--soln-separator",
    "",
];

/// Scoped directory holding every artifact of one call.
///
/// Dropping it removes the directory, whichever way the call ends.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> MznResult<Self> {
        let dir = tempfile::Builder::new().prefix("mznb-").tempdir()?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn model_path(&self) -> PathBuf {
        self.path().join("model.mzn")
    }

    pub fn data_path(&self) -> PathBuf {
        self.path().join("data.json")
    }

    pub fn fzn_path(&self) -> PathBuf {
        self.path().join("model.fzn")
    }

    pub fn ozn_path(&self) -> PathBuf {
        self.path().join("model.ozn")
    }

    /// Raw solver stream, replayed into the reconstruction stage.
    pub fn solver_output_path(&self) -> PathBuf {
        self.path().join("solver.out")
    }
}

/// Everything a strategy needs to build its commands.
#[derive(Debug, Clone, Copy)]
pub struct Plan<'a> {
    pub request: &'a SolveRequest,
    /// Model tokens that named no registered model.
    pub aux_models: &'a [String],
    pub workspace: &'a Workspace,
}

impl Plan<'_> {
    fn model_and_aux(&self) -> Vec<PathBuf> {
        std::iter::once(self.workspace.model_path())
            .chain(self.aux_models.iter().map(PathBuf::from))
            .collect()
    }

    /// Generated data artifact (if any) followed by the user's data files.
    fn data_args(&self, data: Option<&Path>) -> Vec<PathBuf> {
        data.map(Path::to_path_buf)
            .into_iter()
            .chain(self.request.data_files.iter().cloned())
            .collect()
    }
}

/// What the solve stage(s) left behind for decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveRun {
    /// Standard output of the last stage: the raw annotated solution stream.
    pub output: Vec<u8>,
    /// Compiler error stream, the input of the compiler statistics rules.
    pub compiler_stderr: String,
    /// Solver error stream, searched by the MIP statistics rules.
    pub solver_stderr: String,
}

/// A toolchain generation's capability set.
pub trait PipelineStrategy {
    fn generation(&self) -> ToolchainGeneration;

    /// Command that reports the model's required inputs as JSON.
    fn interface_command(&self, plan: &Plan<'_>) -> StageCommand;

    /// Run the solve stage(s).
    ///
    /// `data` is the generated data artifact, or `None` when no input was
    /// bound.
    fn solve(
        &self,
        plan: &Plan<'_>,
        data: Option<&Path>,
        runner: &dyn StageRunner,
        diagnostics: &mut Diagnostics,
    ) -> MznResult<SolveRun>;
}

/// Run one stage and apply its failure policy.
///
/// An aborting stage that fails ends the pipeline with its error stream. A
/// failed solver run is reported and its output kept. Error-stream text from
/// a stage that otherwise succeeded is a warning.
pub(crate) fn run_stage(
    runner: &dyn StageRunner,
    command: &StageCommand,
    diagnostics: &mut Diagnostics,
) -> MznResult<StageOutput> {
    let output = runner.run(command)?;
    let stderr = output.stderr_text();

    if !output.success() {
        if command.stage.aborts_pipeline() {
            return Err(output.failure(command.stage));
        }
        diagnostics.warn(format!("Error in {}:\n{}", command.stage, stderr));
    } else if !stderr.is_empty() {
        diagnostics.warn(format!("Warning from {}:\n{}", command.stage, stderr));
    }

    Ok(output)
}

/// Single `minizinc` binary printing JSON directly.
#[derive(Debug, Clone)]
pub struct CombinedPipeline {
    minizinc: PathBuf,
}

impl CombinedPipeline {
    pub fn new(minizinc: impl Into<PathBuf>) -> Self {
        Self {
            minizinc: minizinc.into(),
        }
    }

    pub fn solve_command(&self, plan: &Plan<'_>, data: Option<&Path>) -> StageCommand {
        let request = plan.request;
        let mut command = StageCommand::new(Stage::Compile, &self.minizinc)
            .args(["--solver", request.solver.as_str()])
            .flag(request.verbose, "-v")
            .flag(request.statistics, "-s")
            .flag(request.all_solutions, "-a");
        if let Some(limit) = request.effective_time_limit() {
            command = command.arg("--time-limit").arg(limit.to_string());
        }
        command
            .args(["--output-mode", "json"])
            .args(plan.model_and_aux())
            .args(OUTPUT_SHAPING_ARGS)
            .args(plan.data_args(data))
    }
}

impl PipelineStrategy for CombinedPipeline {
    fn generation(&self) -> ToolchainGeneration {
        ToolchainGeneration::Combined
    }

    fn interface_command(&self, plan: &Plan<'_>) -> StageCommand {
        StageCommand::new(Stage::InterfaceQuery, &self.minizinc)
            .args(["--solver", plan.request.solver.as_str()])
            .arg("--model-interface-only")
            .args(plan.model_and_aux())
            .args(plan.request.data_files.iter())
    }

    fn solve(
        &self,
        plan: &Plan<'_>,
        data: Option<&Path>,
        runner: &dyn StageRunner,
        diagnostics: &mut Diagnostics,
    ) -> MznResult<SolveRun> {
        let output = run_stage(runner, &self.solve_command(plan, data), diagnostics)?;
        // One process compiles and solves, so its error stream feeds both
        // statistics rule sets.
        let stderr = output.stderr_text();
        Ok(SolveRun {
            output: output.stdout,
            compiler_stderr: stderr.clone(),
            solver_stderr: stderr,
        })
    }
}

/// `mzn2fzn` → `fzn-<solver>` → `solns2out`.
#[derive(Debug, Clone)]
pub struct LegacyPipeline {
    mzn2fzn: PathBuf,
    solns2out: PathBuf,
    home: Option<PathBuf>,
}

impl LegacyPipeline {
    pub fn new(
        mzn2fzn: impl Into<PathBuf>,
        solns2out: impl Into<PathBuf>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            mzn2fzn: mzn2fzn.into(),
            solns2out: solns2out.into(),
            home,
        }
    }

    /// FlatZinc solver executable; falls back to the bare name so the spawn
    /// error names what was missing.
    fn fzn_program(&self, plan: &Plan<'_>) -> PathBuf {
        let name = plan.request.solver.fzn_binary();
        find_binary(name, self.home.as_deref()).unwrap_or_else(|| PathBuf::from(name))
    }

    pub fn flatten_command(&self, plan: &Plan<'_>, data: Option<&Path>) -> StageCommand {
        let request = plan.request;
        StageCommand::new(Stage::Flatten, &self.mzn2fzn)
            .args(["-G", request.solver.globals_dir()])
            .flag(request.verbose, "-v")
            .flag(request.statistics, "-s")
            .arg("--output-fzn-to-file")
            .arg(plan.workspace.fzn_path())
            .arg("--output-ozn-to-file")
            .arg(plan.workspace.ozn_path())
            .args(plan.model_and_aux())
            .args(plan.data_args(data))
    }

    pub fn solver_command(&self, plan: &Plan<'_>) -> StageCommand {
        let request = plan.request;
        let mut command = StageCommand::new(Stage::Solve, self.fzn_program(plan))
            .flag(request.all_solutions, "-a")
            .flag(request.statistics, "-s")
            .flag(request.verbose, "-v");
        if let Some(limit) = request.effective_time_limit() {
            command = command.arg("-t").arg(limit.to_string());
        }
        command.arg(plan.workspace.fzn_path())
    }

    pub fn reconstruct_command(&self, plan: &Plan<'_>) -> StageCommand {
        StageCommand::new(Stage::Reconstruct, &self.solns2out)
            .args(["--output-mode", "json"])
            .args(OUTPUT_SHAPING_ARGS)
            .arg(plan.workspace.ozn_path())
            .stdin_from(plan.workspace.solver_output_path())
    }
}

impl PipelineStrategy for LegacyPipeline {
    fn generation(&self) -> ToolchainGeneration {
        ToolchainGeneration::Legacy
    }

    fn interface_command(&self, plan: &Plan<'_>) -> StageCommand {
        StageCommand::new(Stage::InterfaceQuery, &self.mzn2fzn)
            .arg("--model-interface-only")
            .args(plan.model_and_aux())
            .args(plan.request.data_files.iter())
    }

    fn solve(
        &self,
        plan: &Plan<'_>,
        data: Option<&Path>,
        runner: &dyn StageRunner,
        diagnostics: &mut Diagnostics,
    ) -> MznResult<SolveRun> {
        let flattened = run_stage(runner, &self.flatten_command(plan, data), diagnostics)?;
        let solved = run_stage(runner, &self.solver_command(plan), diagnostics)?;

        // The solver stream is replayed from a file so no two children are
        // ever connected by a live pipe.
        fs::write(plan.workspace.solver_output_path(), &solved.stdout)?;
        let reconstructed = run_stage(runner, &self.reconstruct_command(plan), diagnostics)?;

        Ok(SolveRun {
            output: reconstructed.stdout,
            compiler_stderr: flattened.stderr_text(),
            solver_stderr: solved.stderr_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MznError;
    use crate::testing::ScriptedRunner;
    use crate::SolverId;

    fn plan<'a>(request: &'a SolveRequest, aux: &'a [String], ws: &'a Workspace) -> Plan<'a> {
        Plan {
            request,
            aux_models: aux,
            workspace: ws,
        }
    }

    #[test]
    fn workspace_is_removed_on_drop() {
        let ws = Workspace::new().unwrap();
        let path = ws.path().to_path_buf();
        fs::write(ws.model_path(), "int: n;").unwrap();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn empty_bindings_pass_no_data_argument() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default();
        let plan = plan(&request, &[], &ws);

        let combined = CombinedPipeline::new("minizinc").solve_command(&plan, None);
        assert!(!combined.has_path_arg(&ws.data_path()));

        let legacy = LegacyPipeline::new("mzn2fzn", "solns2out", None);
        assert!(!legacy.flatten_command(&plan, None).has_path_arg(&ws.data_path()));
    }

    #[test]
    fn combined_solve_command_layout() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::new(SolverId::Chuffed)
            .with_all_solutions(true)
            .with_statistics(true)
            .with_time_limit(500)
            .with_data_files(["extra.dzn"]);
        let aux = vec!["lib.mzn".to_string()];
        let plan = plan(&request, &aux, &ws);
        let data = ws.data_path();

        let args = CombinedPipeline::new("minizinc")
            .solve_command(&plan, Some(&data))
            .arg_strings();

        let model = ws.model_path().display().to_string();
        let data = data.display().to_string();
        let mut expected = vec![
            "--solver", "chuffed", "-s", "-a", "--time-limit", "500", "--output-mode", "json",
            model.as_str(), "lib.mzn",
        ];
        expected.extend(OUTPUT_SHAPING_ARGS);
        expected.extend([data.as_str(), "extra.dzn"]);
        assert_eq!(args, expected);
    }

    #[test]
    fn interface_commands_never_take_the_generated_data() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default().with_data_files(["d.dzn"]);
        let plan = plan(&request, &[], &ws);

        let combined = CombinedPipeline::new("minizinc").interface_command(&plan);
        assert_eq!(combined.stage, Stage::InterfaceQuery);
        assert!(combined.has_arg("--model-interface-only"));
        assert!(combined.has_arg("d.dzn"));
        assert!(!combined.has_path_arg(&ws.data_path()));

        let legacy = LegacyPipeline::new("mzn2fzn", "solns2out", None).interface_command(&plan);
        assert_eq!(legacy.program, PathBuf::from("mzn2fzn"));
        assert_eq!(legacy.args[0], "--model-interface-only");
    }

    #[test]
    fn legacy_commands_share_workspace_artifacts() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::new(SolverId::Cbc).with_time_limit(1000);
        let plan = plan(&request, &[], &ws);
        let legacy = LegacyPipeline::new("mzn2fzn", "solns2out", None);

        let flatten = legacy.flatten_command(&plan, None);
        assert_eq!(&flatten.arg_strings()[..2], ["-G", "linear"]);
        assert!(flatten.has_path_arg(&ws.fzn_path()));
        assert!(flatten.has_path_arg(&ws.ozn_path()));

        let solve = legacy.solver_command(&plan);
        assert!(solve.program.ends_with("fzn-cbc"));
        assert_eq!(
            solve.arg_strings(),
            vec!["-t".to_string(), "1000".to_string(), ws.fzn_path().display().to_string()]
        );

        let reconstruct = legacy.reconstruct_command(&plan);
        assert_eq!(reconstruct.stdin, Some(ws.solver_output_path()));
        assert!(reconstruct.has_path_arg(&ws.ozn_path()));
        assert!(reconstruct.has_arg("--soln-separator"));
    }

    #[test]
    fn zero_time_limit_is_not_passed_on() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::new(SolverId::Gecode).with_time_limit(0);
        let plan = plan(&request, &[], &ws);

        let combined = CombinedPipeline::new("minizinc").solve_command(&plan, None);
        assert!(!combined.has_arg("--time-limit"));

        let solve = LegacyPipeline::new("mzn2fzn", "solns2out", None).solver_command(&plan);
        assert_eq!(solve.arg_strings(), vec![ws.fzn_path().display().to_string()]);
    }

    #[test]
    fn legacy_solver_failure_is_reported_but_not_fatal() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default();
        let plan = plan(&request, &[], &ws);
        let runner = ScriptedRunner::new()
            .respond(Stage::Flatten, StageOutput::ok(""))
            .respond(Stage::Solve, StageOutput::failed("out of memory"))
            .respond(Stage::Reconstruct, StageOutput::ok("{\"x\": 1}\n"));
        let mut diagnostics = Diagnostics::new();

        let run = LegacyPipeline::new("mzn2fzn", "solns2out", None)
            .solve(&plan, None, &runner, &mut diagnostics)
            .unwrap();

        assert_eq!(run.output, b"{\"x\": 1}\n");
        assert_eq!(diagnostics.lines(), ["Error in solver:\nout of memory"]);
        assert_eq!(runner.stages(), vec![Stage::Flatten, Stage::Solve, Stage::Reconstruct]);
    }

    #[test]
    fn legacy_reconstruct_reads_solver_stream() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default();
        let plan = plan(&request, &[], &ws);
        let runner = ScriptedRunner::new()
            .respond(Stage::Flatten, StageOutput::ok(""))
            .respond(Stage::Solve, StageOutput::ok("x = 1;\n----------\n"))
            .respond(Stage::Reconstruct, StageOutput::ok("{}"));

        LegacyPipeline::new("mzn2fzn", "solns2out", None)
            .solve(&plan, None, &runner, &mut Diagnostics::new())
            .unwrap();

        let replayed = fs::read_to_string(ws.solver_output_path()).unwrap();
        assert_eq!(replayed, "x = 1;\n----------\n");
    }

    #[test]
    fn flatten_failure_aborts_before_solving() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default();
        let plan = plan(&request, &[], &ws);
        let runner = ScriptedRunner::new().respond(Stage::Flatten, StageOutput::failed("type error"));

        let err = LegacyPipeline::new("mzn2fzn", "solns2out", None)
            .solve(&plan, None, &runner, &mut Diagnostics::new())
            .unwrap_err();

        assert_eq!(err.to_string(), "Error in mzn2fzn:\ntype error");
        assert!(matches!(err, MznError::StageFailed { stage: Stage::Flatten, .. }));
        assert_eq!(runner.stages(), vec![Stage::Flatten]);
    }

    #[test]
    fn stderr_on_success_is_a_warning() {
        let ws = Workspace::new().unwrap();
        let request = SolveRequest::default();
        let plan = plan(&request, &[], &ws);
        let runner = ScriptedRunner::new().respond(
            Stage::Compile,
            StageOutput {
                code: Some(0),
                stdout: b"{}".to_vec(),
                stderr: b"Warning: undefined result\n".to_vec(),
            },
        );
        let mut diagnostics = Diagnostics::new();

        let run = CombinedPipeline::new("minizinc")
            .solve(&plan, None, &runner, &mut diagnostics)
            .unwrap();

        assert_eq!(run.compiler_stderr, "Warning: undefined result");
        assert_eq!(
            diagnostics.lines(),
            ["Warning from MiniZinc:\nWarning: undefined result"]
        );
    }
}
