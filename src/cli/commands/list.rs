//! List command implementation.

use crate::core::catalog::AutomationCatalog;
use crate::core::fetcher::{FlowCache, MetadataFetcher};
use crate::models::automation::AutomationType;
use crate::services::salesforce::RestClient;
use crate::Result;
use colored::Colorize;

/// Fetch and print the automation catalog for the named objects.
pub async fn list(sobjects: &[String], type_filter: Option<&str>) -> Result<()> {
    let types: Vec<AutomationType> = match type_filter {
        Some(s) => vec![s.parse()?],
        None => AutomationType::ALL.to_vec(),
    };

    let client = RestClient::from_config()?;
    let fetcher = MetadataFetcher::new(&client);
    let mut catalog = AutomationCatalog::new();
    // One org-wide flow scan shared across all requested objects.
    let mut flow_cache = FlowCache::default();

    for sobject in sobjects {
        println!("{}", format!("Fetching automation for {}...", sobject).cyan());
        for automation_type in &types {
            catalog.mark_loading(sobject, *automation_type);
            match fetcher.fetch(sobject, *automation_type, &mut flow_cache).await {
                Ok(items) => catalog.insert_items(sobject, *automation_type, items),
                Err(e) => {
                    tracing::warn!("Fetch failed for {} {}: {}", sobject, automation_type, e);
                    catalog.mark_load_error(sobject, *automation_type, &e.to_string());
                }
            }
        }
    }
    println!();

    for sobject in sobjects {
        println!("{}", sobject.bold().underline());
        let mut count = 0;
        for item in catalog.items_for_sobject(sobject) {
            count += 1;
            let state = if item.current_active {
                "active".green()
            } else {
                "inactive".red()
            };
            let version = item
                .current_active_version
                .map(|v| format!(" (v{})", v))
                .unwrap_or_default();
            println!(
                "  {:<22} {:<40} {}{}",
                item.automation_type.to_string(),
                item.label,
                state,
                version
            );
        }
        if count == 0 {
            println!("  {}", "no automation found".dimmed());
        }

        for automation_type in &types {
            if let Some(state) = catalog.load_state(sobject, *automation_type) {
                if let Some(ref error) = state.error {
                    println!(
                        "  {} {}: {}",
                        "[FAIL]".red(),
                        automation_type,
                        error
                    );
                }
            }
        }
        println!();
    }

    println!(
        "{} {} item(s) across {} object(s)",
        "Total:".bold(),
        catalog.len(),
        sobjects.len()
    );
    Ok(())
}
