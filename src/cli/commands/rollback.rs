//! Rollback command implementation.

use crate::core::rollback;
use crate::models::deployment;
use crate::services::salesforce::RestClient;
use crate::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Execute the rollback command.
pub async fn rollback(snapshot_file: &Path) -> Result<()> {
    println!("{}", "Rolling back deployment...".bold().cyan());
    println!();

    let snapshot = rollback::load_snapshot(snapshot_file)?;
    let client = RestClient::from_config()?;
    let mut tracked = snapshot.items.clone();

    let pb = ProgressBar::new(snapshot.items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Rolling back...");

    let mut on_batch = |batch: &deployment::ProgressBatch| {
        deployment::merge_progress(&mut tracked, batch);
        let finished = batch
            .iter()
            .filter(|(_, item)| !item.status.is_in_flight())
            .count();
        pb.inc(finished as u64);
    };

    let result = rollback::rollback_deployment(&client, snapshot.items, &mut on_batch).await;
    pb.finish_and_clear();

    let items = match result {
        Ok(items) => items,
        Err(e) => {
            deployment::mark_in_flight_error(&mut tracked);
            println!("{} {}", "[FAILED] Rollback aborted:".bold().red(), e);
            super::print_status_table(&tracked);
            return Err(e);
        }
    };

    println!();
    println!("{}", "Rollback Summary".bold().green());
    super::print_status_table(&items);

    Ok(())
}
