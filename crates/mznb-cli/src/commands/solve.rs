use super::{open_session, print_cell, write_namespace};
use anyhow::{bail, Context, Result};
use mznb_core::MznbConfig;
use mznb_notebook::MinizincArgs;
use std::path::Path;

/// One `%minizinc` call whose models all come from files.
pub fn handle(
    config: &MznbConfig,
    args: &MinizincArgs,
    namespace: Option<&Path>,
    write_back: bool,
) -> Result<()> {
    let mut session = open_session(config, namespace)?;

    let output = session
        .minizinc_with(args.clone(), None)
        .context("solve failed")?;
    print_cell(&output)?;
    if output.failed {
        bail!("solve did not complete");
    }

    if let (true, Some(path)) = (write_back, namespace) {
        write_namespace(path, session.into_namespace())?;
    }
    Ok(())
}
