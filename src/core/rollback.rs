//! Rollback coordinator.
//!
//! A rollback is not a separate algorithm: it selects the items that reached
//! Deployed, substitutes each deploy payload with the pristine snapshot
//! preserved during prepare, and replays the executor with
//! `is_rollback = true`. It is one-shot and covers all deployed items; there
//! is no per-item rollback selection.

use crate::core::executor;
use crate::models::deployment::{DeploymentItemMap, DeploymentItemStatus, ProgressSink};
use crate::services::salesforce::SalesforceApi;
use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Roll back every deployed item in the map.
pub async fn rollback_deployment<A: SalesforceApi + ?Sized>(
    api: &A,
    mut items: DeploymentItemMap,
    on_batch: ProgressSink<'_>,
) -> Result<DeploymentItemMap> {
    let deployed_keys: Vec<String> = items
        .iter()
        .filter(|(_, item)| item.status == DeploymentItemStatus::Deployed)
        .map(|(key, _)| key.clone())
        .collect();

    if deployed_keys.is_empty() {
        return Err(crate::Error::NothingToRollback(
            "no items in Deployed status".to_string(),
        ));
    }

    tracing::info!("Rolling back {} deployed item(s)", deployed_keys.len());

    for key in &deployed_keys {
        if let Some(item) = items.get_mut(key) {
            // Replay the untouched original value.
            item.metadata_deploy = item.metadata_rollback.clone();
            item.deploy_error = None;
            item.status = DeploymentItemStatus::RollingBack;
        }
    }

    executor::deploy_metadata(api, items, true, on_batch).await
}

/// Default snapshot file path.
pub fn default_snapshot_path() -> PathBuf {
    PathBuf::from("automation-snapshot.json")
}

/// Save a post-deploy snapshot (statuses plus preserved rollback payloads) to
/// a JSON file so `rollback` can replay it later.
pub fn save_snapshot(plan: &crate::models::deployment::DeploymentPlan, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;

    tracing::info!("Snapshot saved to {:?}", path);
    Ok(())
}

/// Load a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<crate::models::deployment::DeploymentPlan> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| crate::Error::InvalidSnapshotFile(path.display().to_string()))?;
    let plan = serde_json::from_str(&content)
        .map_err(|_| crate::Error::InvalidSnapshotFile(path.display().to_string()))?;
    Ok(plan)
}
