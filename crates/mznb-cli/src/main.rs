use clap::Parser;
use mznb_cli::{Cli, Commands};
use mznb_core::{MznError, MznbConfig};
use std::io;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

/// Process exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    /// Command failed (bad arguments, stage failure, I/O)
    Failure = 1,
    /// Solver output could not be decoded
    Protocol = 2,
    /// No usable toolchain
    Initialization = 3,
}

impl ExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<MznError>() {
            Some(MznError::ToolchainMissing(_)) => ExitCode::Initialization,
            Some(e) if e.is_protocol_failure() => ExitCode::Protocol,
            _ => ExitCode::Failure,
        }
    }
}

/// An explicit `--config` file that does not exist yet means defaults, so
/// `config init --config <path>` can create it.
fn load_config(cli: &Cli) -> anyhow::Result<MznbConfig> {
    let config = match &cli.config {
        Some(path) if path.exists() => MznbConfig::load_from(path)?,
        Some(_) => MznbConfig::default(),
        None => MznbConfig::load()?,
    };
    Ok(config)
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over --log-level and the config file.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli, config: &MznbConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Check => commands::check::handle(config),
        Commands::Solve {
            args,
            namespace,
            write_namespace,
        } => commands::solve::handle(config, args, namespace.as_deref(), *write_namespace),
        Commands::Run { script, namespace } => {
            commands::run::handle(config, script, namespace.as_deref())
        }
        Commands::Config { command } => commands::config::handle(cli.config.as_deref(), config, command),
    }
}

fn main() {
    let cli = Cli::parse();

    let loaded = load_config(&cli);
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&level);

    let result = loaded.and_then(|config| run(&cli, &config));
    let code = match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            debug!(error = ?e, "command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::for_error(&e)
        }
    };

    std::process::exit(code as i32);
}
