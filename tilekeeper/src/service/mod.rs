//! High-level service facade for tilekeeper.
//!
//! [`PrerenderService`] owns the shared dirty registry and restart signal and
//! wires them into the scanner, marker and scheduler, so callers only deal
//! with configuration.
//!
//! # Example
//!
//! ```ignore
//! use tilekeeper::config::ConfigFile;
//! use tilekeeper::service::PrerenderService;
//!
//! let service = PrerenderService::from_config(ConfigFile::load()?)?;
//! service.run(shutdown_token).await?;
//! ```

mod error;
mod facade;

pub use error::ServiceError;
pub use facade::PrerenderService;
