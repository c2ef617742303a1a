//! Plain-text notebook scripts (`.mznb`).
//!
//! ```text
//! # knapsack
//! %let n = 3
//! %%mzn_model base
//! int: n;
//! %%minizinc -m bind base
//! var 1..n: x;
//! solve maximize x;
//! %show x
//! ```
//!
//! A `%%minizinc` or `%%mzn_model` line opens a cell whose body runs up to
//! the next directive. Outside cells, blank lines and `#` comments are
//! skipped.

use crate::{CellOutput, Session};
use anyhow::{anyhow, bail, Context, Result};
use mznb_core::Namespace;
use serde_json::Value;

/// One directive of a script, with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptItem {
    Minizinc {
        line_no: usize,
        args: String,
        cell: Option<String>,
    },
    Model {
        line_no: usize,
        args: String,
        cell: String,
    },
    Let {
        line_no: usize,
        name: String,
        value: Value,
    },
    Show {
        line_no: usize,
        name: String,
    },
}

impl ScriptItem {
    pub fn line_no(&self) -> usize {
        match self {
            ScriptItem::Minizinc { line_no, .. }
            | ScriptItem::Model { line_no, .. }
            | ScriptItem::Let { line_no, .. }
            | ScriptItem::Show { line_no, .. } => *line_no,
        }
    }
}

/// Output of one executed directive.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRun {
    pub line_no: usize,
    pub output: CellOutput,
}

enum CellKind {
    Minizinc,
    Model,
}

struct OpenCell {
    kind: CellKind,
    line_no: usize,
    args: String,
    body: Vec<String>,
}

impl OpenCell {
    fn close(self) -> ScriptItem {
        let mut body = self.body;
        while body.last().is_some_and(|l| l.trim().is_empty()) {
            body.pop();
        }
        let text = body.join("\n");
        match self.kind {
            CellKind::Minizinc => ScriptItem::Minizinc {
                line_no: self.line_no,
                args: self.args,
                cell: Some(text),
            },
            CellKind::Model => ScriptItem::Model {
                line_no: self.line_no,
                args: self.args,
                cell: text,
            },
        }
    }
}

/// Split a line into its directive word and the rest.
fn directive(line: &str) -> Option<(&str, &str)> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line.trim_end(), ""),
    };
    matches!(
        head,
        "%%minizinc" | "%%mzn_model" | "%minizinc" | "%let" | "%show"
    )
    .then_some((head, rest))
}

fn parse_let(rest: &str, line_no: usize) -> Result<ScriptItem> {
    let (name, json) = rest
        .split_once('=')
        .ok_or_else(|| anyhow!("line {}: expected `%let <name> = <json>`", line_no))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        bail!("line {}: invalid variable name `{}`", line_no, name);
    }
    let value: Value = serde_json::from_str(json.trim())
        .with_context(|| format!("line {}: value of `{}` is not valid JSON", line_no, name))?;
    Ok(ScriptItem::Let {
        line_no,
        name: name.to_string(),
        value,
    })
}

/// Parse a script into directives.
pub fn parse_script(text: &str) -> Result<Vec<ScriptItem>> {
    let mut items = Vec::new();
    let mut open: Option<OpenCell> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        let Some((head, rest)) = directive(line) else {
            match open.as_mut() {
                Some(cell) => cell.body.push(line.to_string()),
                None => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        bail!("line {}: expected a directive, found `{}`", line_no, trimmed);
                    }
                }
            }
            continue;
        };

        if let Some(cell) = open.take() {
            items.push(cell.close());
        }

        let args = rest.to_string();
        match head {
            "%%minizinc" | "%%mzn_model" => {
                let kind = if head == "%%minizinc" {
                    CellKind::Minizinc
                } else {
                    CellKind::Model
                };
                open = Some(OpenCell {
                    kind,
                    line_no,
                    args,
                    body: Vec::new(),
                });
            }
            "%minizinc" => items.push(ScriptItem::Minizinc {
                line_no,
                args,
                cell: None,
            }),
            "%let" => items.push(parse_let(rest, line_no)?),
            _ => {
                if rest.is_empty() {
                    bail!("line {}: `%show` needs a variable name", line_no);
                }
                items.push(ScriptItem::Show {
                    line_no,
                    name: args,
                });
            }
        }
    }

    if let Some(cell) = open {
        items.push(cell.close());
    }
    Ok(items)
}

impl<N: Namespace> Session<N> {
    /// Run every directive of `text` in order.
    ///
    /// Printed errors do not stop the script; an undecodable solver stream
    /// does.
    pub fn run_script(&mut self, text: &str) -> Result<Vec<CellRun>> {
        let items = parse_script(text)?;
        let mut runs = Vec::with_capacity(items.len());

        for item in items {
            let line_no = item.line_no();
            let output = match item {
                ScriptItem::Minizinc { args, cell, .. } => self
                    .minizinc(&args, cell.as_deref())
                    .with_context(|| format!("cell at line {}", line_no))?,
                ScriptItem::Model { args, cell, .. } => self
                    .mzn_model(&args, &cell)
                    .with_context(|| format!("cell at line {}", line_no))?,
                ScriptItem::Let { name, value, .. } => {
                    self.namespace_mut().set(&name, value);
                    CellOutput::default()
                }
                ScriptItem::Show { name, .. } => match self.namespace().get(&name) {
                    Some(value) => CellOutput {
                        value: Some(value),
                        ..CellOutput::default()
                    },
                    None => CellOutput::failure(format!("Variable {} is undefined", name)),
                },
            };
            runs.push(CellRun { line_no, output });
        }

        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session, FakeToolchain};
    use serde_json::json;

    const SCRIPT: &str = "\
# knapsack
%let n = 3

%%mzn_model base
int: n;

%%minizinc -m bind base
var 1..n: x;
% largest x
solve maximize x;

%show x
";

    #[test]
    fn parses_cells_and_line_commands() {
        let items = parse_script(SCRIPT).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(
            items[0],
            ScriptItem::Let {
                line_no: 2,
                name: "n".into(),
                value: json!(3)
            }
        );
        assert_eq!(
            items[1],
            ScriptItem::Model {
                line_no: 4,
                args: "base".into(),
                cell: "int: n;".into()
            }
        );
        assert_eq!(
            items[2],
            ScriptItem::Minizinc {
                line_no: 7,
                args: "-m bind base".into(),
                cell: Some("var 1..n: x;\n% largest x\nsolve maximize x;".into())
            }
        );
        assert_eq!(
            items[3],
            ScriptItem::Show {
                line_no: 12,
                name: "x".into()
            }
        );
    }

    #[test]
    fn model_comments_are_not_directives() {
        let items = parse_script("%%minizinc\n%% header comment\n%shown later\n").unwrap();
        assert_eq!(
            items,
            vec![ScriptItem::Minizinc {
                line_no: 1,
                args: String::new(),
                cell: Some("%% header comment\n%shown later".into())
            }]
        );
    }

    #[test]
    fn stray_text_outside_cells_is_rejected() {
        let err = parse_script("var int: x;\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn bad_let_value_is_rejected() {
        let err = parse_script("%let n = [1,\n").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
        assert!(parse_script("%let = 1\n").is_err());
    }

    #[test]
    fn script_runs_against_the_session() {
        let mut s = session(FakeToolchain::new().inputs(&["n"]).solutions(&[json!({"x": 3})]));

        let runs = s.run_script(SCRIPT).unwrap();

        assert_eq!(runs.len(), 4);
        assert_eq!(runs[3].output.value, Some(json!(3)));
        assert!(runs.iter().all(|run| !run.output.failed));
        assert_eq!(s.namespace()["n"], json!(3));
        assert!(s.registry().is_empty());
    }

    #[test]
    fn show_of_unknown_name_prints_an_error() {
        let mut s = session(FakeToolchain::new());
        let runs = s.run_script("%show nothing\n").unwrap();
        assert_eq!(runs[0].output.stdout, vec!["Variable nothing is undefined"]);
        assert!(runs[0].output.failed);
    }

    #[test]
    fn decode_failure_stops_the_script() {
        let mut s = session(FakeToolchain::new().raw_output("{}{}"));
        let err = s
            .run_script("%minizinc model.mzn\n%let after = 1\n")
            .unwrap_err();
        assert!(err.to_string().contains("cell at line 1"));
        assert!(!s.namespace().contains_key("after"));
    }
}
