//! Run command: scan the cache, then prerender until interrupted.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Scan, prerender and consume expiry notifications until Ctrl-C.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("run");
    let service = runner.create_service()?;

    let config = runner.config();
    println!("Tile cache:     {}", config.dirs.tiles.display());
    println!("Notifications:  {}", config.dirs.expires.display());
    println!(
        "Prerender:      zoom {}-{}, priority {:?}",
        config.prerender.min_zoom, config.prerender.max_zoom, config.prerender.zoom_prio
    );
    println!();
    println!("Press Ctrl-C to stop.");

    runner.block_on(async move {
        let shutdown = CancellationToken::new();
        let signal_shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, shutting down"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
            }
            signal_shutdown.cancel();
        });

        service.run(shutdown).await
    })?;

    println!("Stopped.");
    Ok(())
}
