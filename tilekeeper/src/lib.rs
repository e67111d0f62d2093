//! Tilekeeper - dirty-tile tracking and prerendering for raster tile caches
//!
//! This library keeps a rendered tile cache fresh as upstream map data
//! changes. Expiry notifications mark tiles dirty across the whole zoom
//! pyramid, a startup scan rebuilds dirty state from disk, and a prerender
//! scheduler re-renders dirty tiles through a bounded worker pool.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use tilekeeper::config::ConfigFile;
//! use tilekeeper::service::PrerenderService;
//!
//! let service = PrerenderService::from_config(ConfigFile::load()?)?;
//!
//! // Scan the cache, then render and consume notifications until cancelled
//! service.run(shutdown_token).await?;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod marker;
pub mod registry;
pub mod render;
pub mod scanner;
pub mod scheduler;
pub mod service;
pub mod time;

/// Version of the tilekeeper library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
