//! Deploy command implementation.

use crate::core::{executor, planner, rollback};
use crate::models::deployment::{self, DeploymentPlan};
use crate::services::salesforce::RestClient;
use crate::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Execute the deploy command.
pub async fn deploy(plan_file: &Path, output: Option<&Path>) -> Result<()> {
    println!("{}", "Deploying automation changes...".bold().cyan());
    println!();

    let plan = planner::load_plan(plan_file)?;
    if !executor::has_deployable_items(&plan.items) {
        return Err(crate::Error::PlanValidationError(
            "plan has no items ready for deploy".to_string(),
        ));
    }

    let client = RestClient::from_config()?;
    let mut tracked = plan.items.clone();

    let pb = ProgressBar::new(plan.items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Deploying...");

    let mut on_batch = |batch: &deployment::ProgressBatch| {
        deployment::merge_progress(&mut tracked, batch);
        let finished = batch
            .iter()
            .filter(|(_, item)| !item.status.is_in_flight())
            .count();
        pb.inc(finished as u64);
    };

    let result = executor::deploy_metadata(&client, plan.items, false, &mut on_batch).await;
    pb.finish_and_clear();

    let items = match result {
        Ok(items) => items,
        Err(e) => {
            deployment::mark_in_flight_error(&mut tracked);
            println!("{} {}", "[FAILED] Deploy aborted:".bold().red(), e);
            super::print_status_table(&tracked);
            // Persist whatever finished so a partial deploy can still be
            // rolled back.
            let snapshot = DeploymentPlan::new(&plan.api_version, tracked);
            let snapshot_path = output
                .map(|p| p.to_path_buf())
                .unwrap_or_else(rollback::default_snapshot_path);
            rollback::save_snapshot(&snapshot, &snapshot_path)?;
            return Err(e);
        }
    };

    println!();
    println!("{}", "Deploy Summary".bold().green());
    super::print_status_table(&items);
    println!();

    let snapshot = DeploymentPlan::new(&plan.api_version, items);
    for (status, count) in snapshot.status_counts() {
        println!("  {} {}", format!("{}:", status).bold(), count);
    }
    println!();

    let snapshot_path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(rollback::default_snapshot_path);
    rollback::save_snapshot(&snapshot, &snapshot_path)?;
    println!(
        "{} {}",
        "Snapshot saved to:".bold().green(),
        snapshot_path.display()
    );
    println!(
        "  To undo: {}",
        format!("jetstream-automation rollback {}", snapshot_path.display()).cyan()
    );

    Ok(())
}
