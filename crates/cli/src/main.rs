//! groupperms - command line inspection of group-based permissions

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match commands::load_settings(&cli.dir) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose);
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose || config.debug);

    let result = commands::open_engine(&cli.dir, config)
        .and_then(|engine| commands::run(&engine, &cli.command, &mut std::io::stdout().lock()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
