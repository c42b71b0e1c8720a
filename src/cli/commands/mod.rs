//! CLI command implementations.

pub mod deploy;
pub mod list;
pub mod plan;
pub mod rollback;
pub mod verify;

use crate::models::deployment::{DeploymentItem, DeploymentItemMap, DeploymentItemStatus};
use colored::Colorize;

/// Print one status row per item, with error details where present.
pub(crate) fn print_status_table(items: &DeploymentItemMap) {
    for (key, item) in items {
        println!("  {} {}", status_badge(item), key.bold());
        if let Some(error) = item.retrieve_error.as_ref().or(item.deploy_error.as_ref()) {
            println!("      {} {}", "error:".red(), compact_error(error));
        }
    }
}

fn status_badge(item: &DeploymentItem) -> colored::ColoredString {
    let label = format!("[{}]", item.status);
    match item.status {
        DeploymentItemStatus::Deployed | DeploymentItemStatus::RolledBack => label.green(),
        DeploymentItemStatus::Error => label.red(),
        DeploymentItemStatus::ReadyForDeploy => label.cyan(),
        _ => label.yellow(),
    }
}

/// Render a raw Salesforce error body on one line.
fn compact_error(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(entries) => entries
            .iter()
            .map(|e| {
                e["message"]
                    .as_str()
                    .map(String::from)
                    .unwrap_or_else(|| e.to_string())
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
