//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, runtime creation and
//! service construction to reduce duplication across command handlers.

use std::future::Future;
use std::path::Path;

use tilekeeper::config::{default_log_file, ConfigFile};
use tilekeeper::logging::{init_logging, split_log_path, LoggingGuard};
use tilekeeper::service::PrerenderService;
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    /// Runtime driving service futures
    runtime: Runtime,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to load instead of ~/.tilekeeper/config.ini
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file)
            .or_else(|| split_log_path(&default_log_file()))
            .ok_or_else(|| {
                CliError::LoggingInit(format!(
                    "invalid log file path '{}'",
                    config.logging.file.display()
                ))
            })?;

        let logging_guard = init_logging(&log_dir, &log_file, true, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        Ok(Self {
            logging_guard,
            config,
            runtime,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Tilekeeper v{}", tilekeeper::VERSION);
        info!("Tilekeeper CLI: {} command", command);
    }

    /// Create the prerender service from the loaded configuration.
    pub fn create_service(&self) -> Result<PrerenderService, CliError> {
        let service = PrerenderService::from_config(self.config.clone())?;
        info!(
            tiles = %self.config.dirs.tiles.display(),
            expires = %self.config.dirs.expires.display(),
            "Service created"
        );
        Ok(service)
    }

    /// Run a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)?
        }
        None => ConfigFile::load()?,
    };
    Ok(config)
}
