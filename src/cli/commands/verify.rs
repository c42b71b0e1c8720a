//! Verify command implementation.

use crate::preflight;
use crate::Result;
use colored::Colorize;

/// Run org preflight checks and report the results.
pub async fn verify() -> Result<()> {
    println!("{}", "Verifying org connection...".bold());
    println!();

    let results = preflight::run_preflight_checks().await?;
    preflight::print_results(&results);
    println!();

    if preflight::all_passed(&results) {
        println!("{}", "All checks passed".green().bold());
        Ok(())
    } else {
        Err(crate::Error::other("One or more preflight checks failed"))
    }
}
