//! Plan command implementation.
//!
//! Reads a changes file, fetches the affected catalog slices, applies the
//! requested toggles, derives the deployment item map from dirty items and
//! stages payloads for deploy.

use crate::core::catalog::AutomationCatalog;
use crate::core::fetcher::{FlowCache, MetadataFetcher};
use crate::core::planner;
use crate::models::changes;
use crate::models::deployment::{self, DeploymentPlan};
use crate::services::salesforce::{RestClient, SalesforceApi};
use crate::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Execute the plan command.
pub async fn plan(changes_path: &Path, output: Option<&Path>) -> Result<()> {
    println!("{}", "Building deployment plan...".bold().cyan());
    println!();

    let changes = changes::load_changes(changes_path)?;
    if changes.changes.is_empty() {
        return Err(crate::Error::PlanValidationError(
            "changes file names no changes".to_string(),
        ));
    }

    let client = RestClient::from_config()?;
    let fetcher = MetadataFetcher::new(&client);
    let mut catalog = AutomationCatalog::new();
    let mut flow_cache = FlowCache::default();

    // Fetch only the (object, type) pairs the changes touch.
    let mut fetched = Vec::new();
    for change in &changes.changes {
        let pair = (change.sobject.clone(), change.automation_type);
        if fetched.contains(&pair) {
            continue;
        }
        println!(
            "  {} {} on {}",
            "Fetching".bold(),
            change.automation_type,
            change.sobject
        );
        catalog.mark_loading(&change.sobject, change.automation_type);
        let items = fetcher
            .fetch(&change.sobject, change.automation_type, &mut flow_cache)
            .await?;
        catalog.insert_items(&change.sobject, change.automation_type, items);
        fetched.push(pair);
    }
    println!();

    // Apply the requested toggles.
    for change in &changes.changes {
        let key = catalog
            .resolve_key(&change.sobject, change.automation_type, &change.name)
            .ok_or_else(|| {
                crate::Error::ItemNotFound(format!(
                    "{} {} on {}",
                    change.automation_type, change.name, change.sobject
                ))
            })?;
        catalog.toggle(&key, change.active, change.version)?;
    }

    let dirty = catalog.dirty_items();
    if dirty.is_empty() {
        println!(
            "{}",
            "Nothing to do: the org already matches the requested state".yellow()
        );
        return Ok(());
    }
    println!(
        "  {} {} item(s) differ from org state",
        "Dirty:".bold(),
        dirty.len()
    );

    // Stage payloads, tracking progress per batch.
    let items = planner::deployment_item_map(&dirty);
    let mut tracked = items.clone();

    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("Retrieving metadata...");

    let mut on_batch = |batch: &deployment::ProgressBatch| {
        deployment::merge_progress(&mut tracked, batch);
        // Phase-start events carry in-flight items; only finished ones
        // advance the bar.
        let finished = batch
            .iter()
            .filter(|(_, item)| !item.status.is_in_flight())
            .count();
        pb.inc(finished as u64);
    };

    let result = planner::prepare_payloads(&client, items, &mut on_batch).await;
    pb.finish_and_clear();

    let items = match result {
        Ok(items) => items,
        Err(e) => {
            // The phase died mid-flight: whatever was still Preparing is an
            // error now, but finalized items keep their status.
            deployment::mark_in_flight_error(&mut tracked);
            println!("{} {}", "[FAILED] Prepare aborted:".bold().red(), e);
            super::print_status_table(&tracked);
            return Err(e);
        }
    };

    println!();
    println!("{}", "Plan Summary".bold().green());
    super::print_status_table(&items);
    println!();

    let plan = DeploymentPlan::new(client.api_version(), items);
    let output_path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(planner::default_plan_path);
    planner::save_plan(&plan, &output_path)?;
    println!(
        "{} {}",
        "Plan saved to:".bold().green(),
        output_path.display()
    );

    println!();
    println!("{}", "Next Steps:".bold().yellow());
    println!(
        "  1. Review the plan: {}",
        format!("cat {}", output_path.display()).cyan()
    );
    println!(
        "  2. Deploy it: {}",
        format!("jetstream-automation deploy {}", output_path.display()).cyan()
    );

    Ok(())
}
