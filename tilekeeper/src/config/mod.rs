//! Configuration for tilekeeper.
//!
//! Settings are read from an INI file (default `~/.tilekeeper/config.ini`).
//! Missing keys fall back to defaults, so an empty or absent file is valid.
//!
//! # Example
//!
//! ```
//! use tilekeeper::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str("[prerender]\nzoom_prio = 12, 14\n").unwrap();
//! assert_eq!(config.prerender.zoom_prio, vec![12, 14]);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, DirsSettings, ExpiresSettings, LoggingSettings, PrerenderSettings,
    RenderSettings, ZoomSettings,
};
