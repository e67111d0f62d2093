//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (show, path, init)
//! - [`mark`] - Single expiry notification pass
//! - [`run`] - Main command (scan, prerender and watch notifications)
//! - [`scan`] - Startup scan report

pub mod config;
pub mod mark;
pub mod run;
pub mod scan;
