//! Tilekeeper CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilekeeper library:
//! keeping a raster tile cache fresh by marking expired tiles dirty and
//! re-rendering them in priority order.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::config::ConfigCommands;
use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilekeeper")]
#[command(version = tilekeeper::VERSION)]
#[command(about = "Dirty-tile tracking and prerendering for raster tile caches", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilekeeper/config.ini)
    #[arg(long = "config", value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the cache, then prerender dirty tiles and watch for expiry
    /// notifications until interrupted
    Run,

    /// Scan the cache once and report dirty tiles per zoom level
    Scan,

    /// Consume pending expiry notifications once
    Mark,

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config_file.as_deref();

    match cli.command {
        Commands::Config { command } => commands::config::run(command, config_path),
        Commands::Run => commands::run::run(&CliRunner::new(config_path, cli.debug)?),
        Commands::Scan => commands::scan::run(&CliRunner::new(config_path, cli.debug)?),
        Commands::Mark => commands::mark::run(&CliRunner::new(config_path, cli.debug)?),
    }
}
