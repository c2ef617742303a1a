//! Solution stream decoding.
//!
//! With separators suppressed, a toolchain in JSON output mode prints one
//! JSON object per solution, joined by `,`, interleaved with `%` comment
//! lines. Stripping the comments and wrapping the rest in `[` … `]` yields
//! the solution sequence. That wrap is the only place the framing is
//! validated, so a decode error here means a toolchain/protocol mismatch.

use crate::bindings::Namespace;
use crate::error::{MznError, MznResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// One variable assignment as printed by the toolchain.
pub type Solution = Map<String, Value>;

static COMMENT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*%+\s*(.*)").expect("comment pattern is valid"));

/// A raw stream split into commentary and payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Comment payloads in emission order, marker and leading space removed.
    pub commentary: Vec<String>,
    /// Every other line, concatenated without a separator.
    pub payload: String,
}

/// Classify every line as commentary or payload.
pub fn partition_lines(text: &str) -> RawOutput {
    let mut raw = RawOutput::default();
    for line in text.lines() {
        match COMMENT_LINE.captures(line) {
            Some(caps) => {
                let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                raw.commentary.push(body.to_string());
            }
            None => raw.payload.push_str(line),
        }
    }
    raw
}

/// A decoded stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Solutions in emission order; later entries improve on earlier ones
    /// for optimisation problems.
    pub solutions: Vec<Solution>,
    pub commentary: Vec<String>,
}

/// Decode a stage's standard output into solutions and commentary.
pub fn decode_solutions(raw: &[u8]) -> MznResult<Decoded> {
    let text = String::from_utf8_lossy(raw);
    let RawOutput {
        commentary,
        payload,
    } = partition_lines(&text);

    let solutions: Vec<Solution> =
        serde_json::from_str(&format!("[{}]", payload)).map_err(MznError::Decode)?;

    Ok(Decoded {
        solutions,
        commentary,
    })
}

/// The part of a solution sequence a call hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Every solution, for `--all-solutions`.
    All(Vec<Solution>),
    /// The last (best) solution, or `None` when nothing was found.
    Last(Option<Solution>),
}

impl Selection {
    pub fn from_solutions(mut solutions: Vec<Solution>, all_solutions: bool) -> Self {
        if all_solutions {
            Selection::All(solutions)
        } else {
            Selection::Last(solutions.pop())
        }
    }

    /// The single assignment a bind operates on.
    pub fn last(&self) -> Option<&Solution> {
        match self {
            Selection::All(solutions) => solutions.last(),
            Selection::Last(solution) => solution.as_ref(),
        }
    }

    /// Number of solutions held.
    pub fn len(&self) -> usize {
        match self {
            Selection::All(solutions) => solutions.len(),
            Selection::Last(solution) => usize::from(solution.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return-mode value; `None` is the "no solution" result.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Selection::All(solutions) => Some(Value::Array(
                solutions.into_iter().map(Value::Object).collect(),
            )),
            Selection::Last(solution) => solution.map(Value::Object),
        }
    }
}

/// Assign every variable of `solution` into `namespace`.
///
/// Returns `name=value` lines when `echo` is set.
pub fn bind_solution(solution: &Solution, namespace: &mut dyn Namespace, echo: bool) -> Vec<String> {
    let mut echoed = Vec::new();
    for (name, value) in solution {
        namespace.set(name, value.clone());
        if echo {
            echoed.push(format!("{}={}", name, value));
        }
    }
    echoed
}
