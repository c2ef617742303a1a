use anyhow::{anyhow, bail, Result};
use mznb_cli::ConfigCommands;
use mznb_core::MznbConfig;
use std::path::{Path, PathBuf};

pub fn handle(path: Option<&Path>, config: &MznbConfig, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigCommands::Init { force } => init(path, *force),
    }
}

fn init(path: Option<&Path>, force: bool) -> Result<()> {
    let target: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => MznbConfig::config_path()
            .ok_or_else(|| anyhow!("could not determine config directory"))?,
    };
    if target.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }
    MznbConfig::default().save_to(&target)?;
    println!("Wrote {}", target.display());
    Ok(())
}
