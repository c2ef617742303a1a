//! Subprocess management for toolchain stages.
//!
//! Every external executable is described by a [`StageCommand`] before it is
//! spawned, so argument lists can be inspected without a toolchain present.
//! A [`StageRunner`] turns a command into a [`StageOutput`]; the default
//! [`ProcessRunner`] blocks until both standard streams are drained.

use crate::error::{MznError, MznResult};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// A step of the solve pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `--version` check performed when a toolchain is loaded.
    Probe,
    /// Interface-only compile reporting required input names.
    InterfaceQuery,
    /// Combined compile-and-solve of the single-binary toolchain.
    Compile,
    /// Legacy flattening into FlatZinc plus output instructions.
    Flatten,
    /// Legacy FlatZinc solver run.
    Solve,
    /// Legacy solution reconstruction from output instructions.
    Reconstruct,
}

impl Stage {
    /// User-facing label used in `Error in <stage>:` messages.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Probe => "version check",
            Stage::InterfaceQuery => "model interface",
            Stage::Compile => "MiniZinc",
            Stage::Flatten => "mzn2fzn",
            Stage::Solve => "solver",
            Stage::Reconstruct => "solns2out",
        }
    }

    /// Whether a non-zero exit from this stage stops the pipeline.
    ///
    /// A failed solver run is reported but whatever it printed is still
    /// handed to reconstruction and decoding.
    pub fn aborts_pipeline(&self) -> bool {
        !matches!(self, Stage::Solve)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A fully constructed stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// File connected to the child's standard input.
    pub stdin: Option<PathBuf>,
}

impl StageCommand {
    pub fn new(stage: Stage, program: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a flag only when `enabled` is set.
    pub fn flag(self, enabled: bool, flag: &str) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Arguments rendered as (lossy) strings, for logging and inspection.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// True if any argument equals `needle` exactly.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// True if any argument equals the given path.
    pub fn has_path_arg(&self, path: &Path) -> bool {
        self.args.iter().any(|a| Path::new(a) == path)
    }
}

/// Captured result of one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard error decoded lossily with trailing whitespace removed.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }

    /// The pipeline-aborting error for a failed `stage`.
    pub fn failure(&self, stage: Stage) -> MznError {
        MznError::StageFailed {
            stage,
            message: self.stderr_text(),
        }
    }
}

/// Executes stage commands.
///
/// The orchestrator only ever talks to toolchain executables through this
/// trait, so a session can be driven by a scripted runner in tests.
pub trait StageRunner {
    fn run(&self, command: &StageCommand) -> MznResult<StageOutput>;
}

/// Spawns real processes with the caller's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl StageRunner for ProcessRunner {
    fn run(&self, command: &StageCommand) -> MznResult<StageOutput> {
        debug!(
            stage = %command.stage,
            program = %command.program.display(),
            args = ?command.arg_strings(),
            "spawning stage"
        );

        let stdin = match &command.stdin {
            Some(path) => Stdio::from(File::open(path)?),
            None => Stdio::null(),
        };

        // The environment is inherited untouched; the toolchain finds its own
        // libraries through it.
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MznError::ProcessStart {
                program: command.program.clone(),
                source,
            })?;

        // wait_with_output drains stdout and stderr together, so a chatty
        // stage cannot block on a full pipe.
        let output = child.wait_with_output()?;

        trace!(
            stage = %command.stage,
            code = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "stage finished"
        );

        Ok(StageOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Find an executable in standard locations.
///
/// Search order:
/// 1. `<home>/bin/<name>` when a toolchain home is configured
/// 2. System PATH
pub fn find_binary(name: &str, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(home) = home {
        let candidate = home.join("bin").join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    which::which(name).ok()
}
