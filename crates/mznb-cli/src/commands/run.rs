use super::{open_session, print_cell};
use anyhow::{bail, Context, Result};
use mznb_core::MznbConfig;
use mznb_notebook::CellOutput;
use std::fs;
use std::path::Path;

pub fn handle(config: &MznbConfig, script: &Path, namespace: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let mut session = open_session(config, namespace)?;

    let runs = session
        .run_script(&text)
        .with_context(|| format!("script {} aborted", script.display()))?;

    for run in &runs {
        if run.output == CellOutput::default() {
            continue;
        }
        println!("[{}]", run.line_no);
        print_cell(&run.output)?;
    }

    let failed: Vec<String> = runs
        .iter()
        .filter(|run| run.output.failed)
        .map(|run| run.line_no.to_string())
        .collect();
    if !failed.is_empty() {
        bail!("cells at line {} failed", failed.join(", "));
    }
    Ok(())
}
