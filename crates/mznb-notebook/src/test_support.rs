//! In-process stand-in for a combined toolchain.

use crate::Session;
use mznb_core::{MznResult, Stage, StageCommand, StageOutput, StageRunner, Toolchain};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Answers the probe, interface query and solve stages.
///
/// Records the stage of every call and the model text seen by each
/// interface query.
#[derive(Debug, Clone)]
pub(crate) struct FakeToolchain {
    inputs: Vec<String>,
    output: String,
    calls: Rc<RefCell<Vec<Stage>>>,
    models: Rc<RefCell<Vec<String>>>,
}

impl FakeToolchain {
    pub(crate) fn new() -> Self {
        Self {
            inputs: Vec::new(),
            output: String::new(),
            calls: Rc::default(),
            models: Rc::default(),
        }
    }

    pub(crate) fn inputs(mut self, names: &[&str]) -> Self {
        self.inputs = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Print each solution as a JSON object, joined by the solution comma.
    pub(crate) fn solutions(mut self, solutions: &[Value]) -> Self {
        self.output = solutions
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("\n,\n");
        self
    }

    pub(crate) fn raw_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    pub(crate) fn calls(&self) -> Rc<RefCell<Vec<Stage>>> {
        Rc::clone(&self.calls)
    }

    pub(crate) fn models(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.models)
    }

    fn success(stdout: String) -> StageOutput {
        StageOutput {
            code: Some(0),
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        }
    }
}

impl StageRunner for FakeToolchain {
    fn run(&self, command: &StageCommand) -> MznResult<StageOutput> {
        self.calls.borrow_mut().push(command.stage);
        match command.stage {
            Stage::Probe => Ok(Self::success(
                "MiniZinc to FlatZinc converter, version 2.8.3\n".to_string(),
            )),
            Stage::InterfaceQuery => {
                let model = command
                    .args
                    .iter()
                    .find(|a| a.to_string_lossy().ends_with("model.mzn"))
                    .map(std::fs::read_to_string)
                    .transpose()?
                    .unwrap_or_default();
                self.models.borrow_mut().push(model);
                let doc = serde_json::json!({ "input": self.inputs });
                Ok(Self::success(doc.to_string()))
            }
            _ => Ok(Self::success(self.output.clone())),
        }
    }
}

/// A session over an empty namespace driven by `fake`.
pub(crate) fn session(fake: FakeToolchain) -> Session {
    Session::start(
        Toolchain::combined("minizinc"),
        Box::new(fake),
        Default::default(),
    )
    .expect("fake toolchain probes successfully")
}
