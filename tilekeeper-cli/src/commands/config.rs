//! Configuration management CLI commands.
//!
//! Provides `config show`, `config path` and `config init` for inspecting
//! and creating the configuration file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use tilekeeper::config::{config_file_path, ConfigFile};

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (file values over defaults)
    Show,

    /// Show the configuration file path
    Path,

    /// Write a default configuration file if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => run_path(config_path),
        ConfigCommands::Init => run_init(config_path),
    }
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    print!("{}", config.to_ini_string());
    Ok(())
}

fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    println!("{}", resolve_path(config_path).display());
    Ok(())
}

fn run_init(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(config_path);
    if ConfigFile::ensure_exists(&path)? {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists", path.display());
    }
    Ok(())
}
