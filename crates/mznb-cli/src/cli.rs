use clap::{Parser, Subcommand, ValueHint};
use mznb_notebook::MinizincArgs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mznb", author, version, about = "Run MiniZinc models against a JSON namespace")]
pub struct Cli {
    /// Set the logging level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file to use instead of ~/.mznb/config.toml
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the toolchain and print its version
    Check,
    /// Solve a model once
    Solve {
        #[command(flatten)]
        args: MinizincArgs,

        /// JSON object file providing model inputs
        #[arg(long, value_hint = ValueHint::FilePath)]
        namespace: Option<PathBuf>,

        /// Write the namespace back after a bind-mode solve
        #[arg(long, requires = "namespace")]
        write_namespace: bool,
    },
    /// Execute a .mznb notebook script
    Run {
        /// Script file
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,

        /// JSON object file seeding the namespace
        #[arg(long, value_hint = ValueHint::FilePath)]
        namespace: Option<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
