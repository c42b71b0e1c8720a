//! Deployment executor.
//!
//! Pushes staged payloads to the org through two mechanisms: Tooling API
//! composite PATCH batches for most types, and a file-based Metadata API
//! deploy (zip package + asynchronous job polling) for Apex triggers.
//! Batches run strictly sequentially so per-item status attribution stays
//! simple; progress events fire once when items enter the phase and then per
//! batch, in issue order.

use crate::generators::package::{TriggerMember, TriggerPackage};
use crate::models::deployment::{DeploymentItemMap, DeploymentItemStatus, ProgressSink};
use crate::services::salesforce::{
    tooling_sobject_url, CompositeRequest, CompositeSubRequest, DeployOptions, DeployResult,
    SalesforceApi, MAX_COMPOSITE_REQUESTS,
};
use crate::Result;
use serde_json::Value;
use std::time::Duration;

/// Seconds between polls of an asynchronous metadata deploy job.
const DEPLOY_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Give up polling after this many attempts.
const DEPLOY_MAX_POLLS: u32 = 150;

/// Deploy staged payloads. With `is_rollback` the same machinery replays the
/// preserved rollback payloads; only the starting status filter and the
/// terminal status differ.
pub async fn deploy_metadata<A: SalesforceApi + ?Sized>(
    api: &A,
    mut items: DeploymentItemMap,
    is_rollback: bool,
    on_batch: ProgressSink<'_>,
) -> Result<DeploymentItemMap> {
    let start_status = if is_rollback {
        DeploymentItemStatus::RollingBack
    } else {
        DeploymentItemStatus::ReadyForDeploy
    };
    let done_status = if is_rollback {
        DeploymentItemStatus::RolledBack
    } else {
        DeploymentItemStatus::Deployed
    };

    let eligible: Vec<String> = items
        .iter()
        .filter(|(_, item)| {
            (item.status == start_status || item.status == DeploymentItemStatus::Deploying)
                && item.retrieve_error.is_none()
                && item.metadata_deploy.is_some()
        })
        .map(|(key, _)| key.clone())
        .collect();

    let (file_keys, patch_keys): (Vec<String>, Vec<String>) = eligible
        .into_iter()
        .partition(|key| items[key].requires_metadata_api);

    if !is_rollback {
        for key in patch_keys.iter().chain(file_keys.iter()) {
            if let Some(item) = items.get_mut(key) {
                item.status = DeploymentItemStatus::Deploying;
            }
        }
    }
    // Surface the Deploying/RollingBack transition so observers can tell
    // which items were mid-phase if the run dies.
    if !patch_keys.is_empty() || !file_keys.is_empty() {
        let phase_event: Vec<_> = patch_keys
            .iter()
            .chain(file_keys.iter())
            .map(|key| (key.clone(), items[key].clone()))
            .collect();
        on_batch(&phase_event);
    }

    tracing::info!(
        "Deploying {} item(s) via PATCH, {} via metadata package (rollback: {})",
        patch_keys.len(),
        file_keys.len(),
        is_rollback
    );

    // Tooling API PATCH path
    for batch_keys in patch_keys.chunks(MAX_COMPOSITE_REQUESTS) {
        let sub_requests: Vec<CompositeSubRequest> = batch_keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let item = &items[key];
                let url = tooling_sobject_url(
                    api.api_version(),
                    item.automation_type.tooling_sobject(),
                    &item.record_id,
                    &[],
                );
                let body = serde_json::json!({
                    "Metadata": item.metadata_deploy,
                });
                CompositeSubRequest::patch(&url, &format!("ref_{}", i), body)
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

            if sub.is_deploy_error() {
                tracing::warn!("PATCH failed for {} (HTTP {})", key, sub.http_status_code);
                item.deploy_error = sub.body.clone();
                item.status = DeploymentItemStatus::Error;
            } else {
                item.status = done_status;
            }
            batch_event.push((key.clone(), item.clone()));
        }
        on_batch(&batch_event);
    }

    // File-based Metadata API path (Apex triggers)
    if !file_keys.is_empty() {
        let result = deploy_trigger_package(api, &mut items, &file_keys, done_status).await?;
        tracing::info!(
            "Metadata deploy job {} finished (success: {})",
            result.id,
            result.success
        );

        let batch_event: Vec<_> = file_keys
            .iter()
            .map(|key| (key.clone(), items[key].clone()))
            .collect();
        on_batch(&batch_event);
    }

    Ok(items)
}

/// Assemble the trigger package, run the asynchronous deploy and apply the
/// outcome to the items.
async fn deploy_trigger_package<A: SalesforceApi + ?Sized>(
    api: &A,
    items: &mut DeploymentItemMap,
    file_keys: &[String],
    done_status: DeploymentItemStatus,
) -> Result<DeployResult> {
    let mut package = TriggerPackage::new(api.api_version());
    for key in file_keys {
        let item = &items[key];
        let retrieved = item
            .metadata_retrieve
            .as_ref()
            .ok_or_else(|| crate::Error::DeployError(format!("no retrieved metadata for {key}")))?;
        let deploy = item
            .metadata_deploy
            .as_ref()
            .ok_or_else(|| crate::Error::DeployError(format!("no deploy payload for {key}")))?;

        package.add_trigger(TriggerMember {
            name: item.full_name.clone(),
            body: retrieved["Body"].as_str().unwrap_or_default().to_string(),
            api_version: format_api_version(&retrieved["ApiVersion"], api.api_version()),
            // The staged payload carries the desired status for forward
            // deploys and the original status for rollbacks.
            active: deploy["status"].as_str() == Some("Active"),
        });
    }

    let zip = package.build_zip()?;
    let job_id = api.deploy_package(zip, DeployOptions::default()).await?;
    tracing::info!("Started metadata deploy job {}", job_id);

    let result = poll_deploy_job(api, &job_id).await?;

    if result.success {
        for key in file_keys {
            if let Some(item) = items.get_mut(key) {
                item.status = done_status;
            }
        }
    } else {
        let failures = result
            .details
            .as_ref()
            .map(|d| d.component_failures.as_slice())
            .unwrap_or_default();
        for key in file_keys {
            if let Some(item) = items.get_mut(key) {
                let problem = failures
                    .iter()
                    .find(|f| f.full_name.as_deref() == Some(item.full_name.as_str()))
                    .and_then(|f| f.problem.clone())
                    .unwrap_or_else(|| "Metadata deploy failed".to_string());
                item.deploy_error = Some(Value::from(problem));
                item.status = DeploymentItemStatus::Error;
            }
        }
    }

    Ok(result)
}

/// Poll the deploy job until it reaches a terminal state.
async fn poll_deploy_job<A: SalesforceApi + ?Sized>(api: &A, job_id: &str) -> Result<DeployResult> {
    for attempt in 0..DEPLOY_MAX_POLLS {
        let result = api.check_deploy_status(job_id).await?;
        if result.done {
            return Ok(result);
        }
        tracing::debug!(
            "Deploy job {} still {:?} (poll {})",
            job_id,
            result.status,
            attempt + 1
        );
        tokio::time::sleep(DEPLOY_POLL_INTERVAL).await;
    }
    Err(crate::Error::DeployTimeout(job_id.to_string()))
}

/// Salesforce returns `ApiVersion` as a JSON number (e.g. `58.0`); render it
/// as the dotted string the meta.xml descriptor needs.
fn format_api_version(value: &Value, fallback: &str) -> String {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| fallback.to_string()),
        Value::String(s) => s.clone(),
        _ => fallback.to_string(),
    }
}

/// Whether any item in the map still needs a deploy pass.
pub fn has_deployable_items(items: &DeploymentItemMap) -> bool {
    items.values().any(|item| {
        item.status == DeploymentItemStatus::ReadyForDeploy && item.retrieve_error.is_none()
    })
}
