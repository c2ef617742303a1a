use anyhow::Result;
use mznb_core::{MznbConfig, SolverId};
use mznb_notebook::Session;
use tracing::info;

/// Load a session the way a notebook would and report what it found.
pub fn handle(config: &MznbConfig) -> Result<()> {
    let session = Session::load(config)?;
    let toolchain = session.toolchain();
    info!(version = %session.version(), "toolchain check passed");

    println!("generation: {}", toolchain.generation());
    println!("driver:     {}", toolchain.driver().display());
    println!("version:    {}", session.version());
    println!("solvers:");
    for solver in SolverId::all() {
        println!(
            "  {:<8} {:<8} {}",
            solver.as_str(),
            solver.display_name(),
            solver.description()
        );
    }
    Ok(())
}
