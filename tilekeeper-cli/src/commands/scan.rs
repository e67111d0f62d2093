//! Scan command: report dirty tiles found in the cache.

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the startup scan once and print what it found.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("scan");
    let service = runner.create_service()?;

    let summary = runner.block_on(service.scan())?;

    println!("Visited:         {}", summary.visited);
    println!("Missing images:  {}", summary.missing);
    println!("Older than cut:  {}", summary.stale);
    println!("Dirty markers:   {}", summary.marked);
    println!();

    let counts = service.registry().counts_by_zoom();
    if counts.is_empty() {
        println!("No dirty tiles.");
        return Ok(());
    }

    println!("{:>5}  {:>12}", "zoom", "dirty");
    for (zoom, count) in counts {
        println!("{:>5}  {:>12}", zoom, count);
    }
    Ok(())
}
