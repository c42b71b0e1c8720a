//! Deployment planner.
//!
//! Converts dirty catalog items into a keyed map of pending deployment
//! operations, then stages payloads: composite GET batches retrieve current
//! metadata, which is cloned twice. One clone becomes the deploy payload,
//! mutated to the desired state; the other is kept pristine as the rollback
//! payload so a later rollback resubmits the untouched original.

use crate::models::automation::{AutomationItem, AutomationType};
use crate::models::deployment::{
    DeploymentItem, DeploymentItemMap, DeploymentItemStatus, DeploymentPlan, ProgressSink,
};
use crate::services::salesforce::{
    tooling_sobject_url, CompositeRequest, CompositeSubRequest, SalesforceApi,
    MAX_COMPOSITE_REQUESTS,
};
use crate::Result;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Derive the pending deployment map from dirty catalog items: exactly one
/// NotStarted item per dirty key, carrying the item's current (not initial)
/// desired state.
pub fn deployment_item_map(items: &[&AutomationItem]) -> DeploymentItemMap {
    let mut map = DeploymentItemMap::new();
    for item in items {
        map.insert(
            item.key.clone(),
            DeploymentItem {
                status: DeploymentItemStatus::NotStarted,
                sobject: item.sobject.clone(),
                automation_type: item.automation_type,
                full_name: item.full_name.clone(),
                record_id: item.record_id.clone(),
                value: item.current_active,
                active_version: item.current_active_version,
                requires_metadata_api: item.automation_type.requires_metadata_api(),
                metadata_retrieve: None,
                metadata_deploy: None,
                metadata_rollback: None,
                retrieve_error: None,
                deploy_error: None,
            },
        );
    }
    map
}

/// Mutate a metadata payload's relevant field to the item's desired state.
fn apply_desired_state(
    automation_type: AutomationType,
    metadata: &mut Value,
    value: bool,
    active_version: Option<u32>,
) {
    match automation_type {
        AutomationType::ApexTrigger => {
            metadata["status"] = Value::from(if value { "Active" } else { "Inactive" });
        }
        AutomationType::Flow => {
            metadata["activeVersionNumber"] = match (value, active_version) {
                (true, Some(version)) => Value::from(version),
                _ => Value::Null,
            };
        }
        AutomationType::ValidationRule
        | AutomationType::WorkflowRule
        | AutomationType::AssignmentRule => {
            metadata["active"] = Value::from(value);
        }
    }
}

/// Retrieve current metadata and stage deploy/rollback payloads.
///
/// Items lacking a retrieved snapshot are marked Preparing and fetched in
/// composite GET batches of at most 25 (triggers additionally request
/// `Body`/`ApiVersion` for the file-based redeploy). Per-item failures become
/// retrieve errors without aborting siblings; a transport error is
/// pipeline-fatal and the caller marks in-flight items as Error. `on_batch`
/// fires once when items enter Preparing and once per batch, in issue order,
/// so callers observing events know which items were mid-phase on a fatal
/// error.
pub async fn prepare_payloads<A: SalesforceApi + ?Sized>(
    api: &A,
    mut items: DeploymentItemMap,
    on_batch: ProgressSink<'_>,
) -> Result<DeploymentItemMap> {
    let pending_keys: Vec<String> = items
        .iter()
        .filter(|(_, item)| {
            item.metadata_retrieve.is_none()
                && matches!(
                    item.status,
                    DeploymentItemStatus::NotStarted | DeploymentItemStatus::Preparing
                )
        })
        .map(|(key, _)| key.clone())
        .collect();

    for key in &pending_keys {
        if let Some(item) = items.get_mut(key) {
            item.status = DeploymentItemStatus::Preparing;
        }
    }
    if !pending_keys.is_empty() {
        let phase_event: Vec<_> = pending_keys
            .iter()
            .map(|key| (key.clone(), items[key].clone()))
            .collect();
        on_batch(&phase_event);
    }

    tracing::info!(
        "Preparing payloads for {} item(s) in batches of {}",
        pending_keys.len(),
        MAX_COMPOSITE_REQUESTS
    );

    for batch_keys in pending_keys.chunks(MAX_COMPOSITE_REQUESTS) {
        let sub_requests: Vec<CompositeSubRequest> = batch_keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let item = &items[key];
                let fields: &[&str] = if item.automation_type == AutomationType::ApexTrigger {
                    &["FullName", "Metadata", "Body", "ApiVersion"]
                } else {
                    &["FullName", "Metadata"]
                };
                let url = tooling_sobject_url(
                    api.api_version(),
                    item.automation_type.tooling_sobject(),
                    &item.record_id,
                    fields,
                );
                CompositeSubRequest::get(&url, &format!("ref_{}", i))
            })
            .collect();

        let response = api
            .composite(CompositeRequest::independent(sub_requests), true)
            .await?;
        if response.composite_response.len() != batch_keys.len() {
            return Err(crate::Error::other(format!(
                "composite returned {} sub-responses for {} sub-requests",
                response.composite_response.len(),
                batch_keys.len()
            )));
        }

        let mut batch_event = Vec::with_capacity(batch_keys.len());
        for (key, sub) in batch_keys.iter().zip(response.composite_response.iter()) {
            let item = items
                .get_mut(key)
                .ok_or_else(|| crate::Error::ItemNotFound(key.clone()))?;

            if sub.is_success() {
                let body = sub.body.clone().unwrap_or(Value::Null);
                let retrieved_metadata = body["Metadata"].clone();
                let mut deploy_metadata = retrieved_metadata.clone();
                apply_desired_state(
                    item.automation_type,
                    &mut deploy_metadata,
                    item.value,
                    item.active_version,
                );
                item.metadata_retrieve = Some(body);
                item.metadata_deploy = Some(deploy_metadata);
                item.metadata_rollback = Some(retrieved_metadata);
                item.status = DeploymentItemStatus::ReadyForDeploy;
            } else {
                tracing::warn!(
                    "Retrieve failed for {} (HTTP {})",
                    key,
                    sub.http_status_code
                );
                item.retrieve_error = sub.body.clone();
                item.status = DeploymentItemStatus::Error;
            }
            batch_event.push((key.clone(), item.clone()));
        }
        on_batch(&batch_event);
    }

    Ok(items)
}

/// Default plan file path next to the current directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("automation-plan.json")
}

/// Save a plan to a JSON file.
pub fn save_plan(plan: &DeploymentPlan, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(plan)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;

    tracing::info!("Plan saved to {:?}", path);
    Ok(())
}

/// Load a plan from a JSON file.
pub fn load_plan(path: &Path) -> Result<DeploymentPlan> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| crate::Error::InvalidPlanFile(path.display().to_string()))?;
    let plan: DeploymentPlan = serde_json::from_str(&content)
        .map_err(|_| crate::Error::InvalidPlanFile(path.display().to_string()))?;
    Ok(plan)
}
