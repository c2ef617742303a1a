//! Scripted stage runner for unit tests.

use crate::error::MznResult;
use crate::subprocess::{Stage, StageCommand, StageOutput, StageRunner};
use std::cell::RefCell;
use std::collections::HashMap;

impl StageOutput {
    pub(crate) fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    pub(crate) fn failed(stderr: &str) -> Self {
        Self {
            code: Some(1),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}

/// Answers each stage with a canned output and records every command.
///
/// Stages without a response succeed silently.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    responses: HashMap<Stage, StageOutput>,
    calls: RefCell<Vec<StageCommand>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, stage: Stage, output: StageOutput) -> Self {
        self.responses.insert(stage, output);
        self
    }

    pub(crate) fn commands(&self) -> Vec<StageCommand> {
        self.calls.borrow().clone()
    }

    pub(crate) fn stages(&self) -> Vec<Stage> {
        self.calls.borrow().iter().map(|c| c.stage).collect()
    }
}

impl StageRunner for ScriptedRunner {
    fn run(&self, command: &StageCommand) -> MznResult<StageOutput> {
        self.calls.borrow_mut().push(command.clone());
        Ok(self
            .responses
            .get(&command.stage)
            .cloned()
            .unwrap_or_else(|| StageOutput::ok("")))
    }
}
