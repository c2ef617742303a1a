pub mod check;
pub mod config;
pub mod run;
pub mod solve;

use anyhow::{bail, Context, Result};
use mznb_core::{MznbConfig, Statistics};
use mznb_notebook::{CellOutput, Session};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Load a JSON object file as the session namespace.
pub(crate) fn read_namespace(path: &Path) -> Result<BTreeMap<String, Value>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read namespace {}", path.display()))?;
    let value: Value = serde_json::from_str(&body)
        .with_context(|| format!("namespace {} is not valid JSON", path.display()))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => bail!("namespace {} must hold a JSON object", path.display()),
    }
}

pub(crate) fn write_namespace(path: &Path, namespace: BTreeMap<String, Value>) -> Result<()> {
    let map: Map<String, Value> = namespace.into_iter().collect();
    let body = serde_json::to_string_pretty(&Value::Object(map))?;
    fs::write(path, body + "\n")
        .with_context(|| format!("failed to write namespace {}", path.display()))
}

/// A session for `config`, seeded from an optional namespace file.
pub(crate) fn open_session(
    config: &MznbConfig,
    namespace: Option<&Path>,
) -> Result<Session> {
    let mut session = Session::load(config)?;
    if let Some(path) = namespace {
        *session.namespace_mut() = read_namespace(path)?;
    }
    Ok(session)
}

fn print_statistics(stats: &Statistics) {
    for line in stats.render_lines() {
        println!("% {}", line);
    }
}

/// Printed lines first, then the value as pretty JSON, then statistics.
pub(crate) fn print_cell(output: &CellOutput) -> Result<()> {
    for line in &output.stdout {
        println!("{}", line);
    }
    if let Some(value) = &output.value {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    if let Some(stats) = &output.statistics {
        print_statistics(stats);
    }
    Ok(())
}
