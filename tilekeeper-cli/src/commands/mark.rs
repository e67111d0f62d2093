//! Mark command: consume pending expiry notifications once.

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run a single marker pass and print its summary.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("mark");
    let service = runner.create_service()?;

    let summary = runner.block_on(service.mark())?;

    if summary.notifications == 0 {
        println!("No pending notifications.");
        return Ok(());
    }

    println!("Notifications:  {}", summary.notifications);
    println!("Expired tiles:  {}", summary.coarse_tiles);
    println!("Pyramid tiles:  {}", summary.candidates);
    println!("Purged:         {}", summary.purged);
    println!("Marked dirty:   {}", summary.marked);
    Ok(())
}
