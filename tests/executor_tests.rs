//! Integration tests for the deployment executor.
//!
//! Tests cover:
//! - The full happy-path status walk for a Tooling PATCH item
//! - Per-item deploy errors on HTTP status above 299
//! - PATCH batching (never more than 25 sub-requests)
//! - The file-based Metadata API path for Apex triggers

mod common;

use common::{deployment_item, prepared_item, respond_each, MockApi};
use jetstream_automation::core::{executor, planner};
use jetstream_automation::models::automation::AutomationType;
use jetstream_automation::models::deployment::{
    merge_progress, DeploymentItemMap, DeploymentItemStatus, ProgressBatch,
};
use jetstream_automation::services::salesforce::{DeployJobStatus, DeployResult};
use serde_json::json;
use std::io::Read;

// Scenario: one inactive validation rule is enabled; the item walks
// Not Started -> Preparing -> Ready for Deploy -> Deploying -> Deployed.
#[tokio::test]
async fn test_happy_path_status_walk() {
    let api = MockApi::new(common::ok_handler());

    let mut items = DeploymentItemMap::new();
    let (key, item) = deployment_item("Account", AutomationType::ValidationRule, "Require_Phone", true);
    assert_eq!(item.status, DeploymentItemStatus::NotStarted);
    items.insert(key.clone(), item);

    let mut observed = vec![DeploymentItemStatus::NotStarted];
    let mut tracked = items.clone();
    let mut on_batch = |batch: &ProgressBatch| {
        merge_progress(&mut tracked, batch);
        observed.push(batch[0].1.status);
    };

    let items = planner::prepare_payloads(&api, items, &mut on_batch)
        .await
        .unwrap();
    assert_eq!(items[&key].status, DeploymentItemStatus::ReadyForDeploy);

    let items = executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    assert_eq!(items[&key].status, DeploymentItemStatus::Deployed);
    assert!(items[&key].deploy_error.is_none());
    assert_eq!(
        observed,
        vec![
            DeploymentItemStatus::NotStarted,
            DeploymentItemStatus::Preparing,
            DeploymentItemStatus::ReadyForDeploy,
            DeploymentItemStatus::Deploying,
            DeploymentItemStatus::Deployed,
        ]
    );
    // The event-merged view converged on the same terminal state
    assert_eq!(tracked[&key].status, DeploymentItemStatus::Deployed);
}

#[tokio::test]
async fn test_patch_error_recorded_per_item() {
    let handler = Box::new(|request: &jetstream_automation::services::salesforce::CompositeRequest| {
        respond_each(request, |i, _| {
            if i == 0 {
                (400, Some(json!([{ "errorCode": "FIELD_INTEGRITY_EXCEPTION", "message": "bad value" }])))
            } else {
                (204, None)
            }
        })
    });
    let api = MockApi::new(handler);

    let mut items = DeploymentItemMap::new();
    for name in ["Rule_A", "Rule_B"] {
        let (key, item) = prepared_item("Account", AutomationType::ValidationRule, name, true);
        items.insert(key, item);
    }

    let mut on_batch = |_: &ProgressBatch| {};
    let items = executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    let statuses: Vec<_> = items.values().map(|i| i.status).collect();
    assert!(statuses.contains(&DeploymentItemStatus::Error));
    assert!(statuses.contains(&DeploymentItemStatus::Deployed));
    let errored = items
        .values()
        .find(|i| i.status == DeploymentItemStatus::Error)
        .unwrap();
    assert!(errored.deploy_error.is_some());
}

#[tokio::test]
async fn test_patch_batching_limit() {
    let api = MockApi::new(common::ok_handler());

    let mut items = DeploymentItemMap::new();
    for i in 0..30 {
        let (key, item) = prepared_item(
            "Account",
            AutomationType::WorkflowRule,
            &format!("Rule_{:02}", i),
            false,
        );
        items.insert(key, item);
    }

    let mut on_batch = |_: &ProgressBatch| {};
    executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    assert_eq!(*api.composite_sizes.lock().unwrap(), vec![25, 5]);
}

#[tokio::test]
async fn test_trigger_deploys_via_metadata_package() {
    let api = MockApi::new(common::ok_handler());
    // First poll still running, second poll done
    api.push_deploy_result(DeployResult {
        id: "0Af000000000001".to_string(),
        status: DeployJobStatus::InProgress,
        done: false,
        success: false,
        details: None,
    });
    api.push_deploy_result(DeployResult {
        id: "0Af000000000001".to_string(),
        status: DeployJobStatus::Succeeded,
        done: true,
        success: true,
        details: None,
    });

    let mut items = DeploymentItemMap::new();
    let (key, item) = prepared_item("Account", AutomationType::ApexTrigger, "AccountAudit", true);
    items.insert(key.clone(), item);

    let mut on_batch = |_: &ProgressBatch| {};
    let items = executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    assert_eq!(items[&key].status, DeploymentItemStatus::Deployed);
    // No composite PATCH was issued for the trigger
    assert!(api.composite_sizes.lock().unwrap().is_empty());

    // The deployed zip carries the manifest, the body and the descriptor
    let zips = api.deployed_zips.lock().unwrap();
    assert_eq!(zips.len(), 1);
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zips[0].clone())).unwrap();
    let mut manifest = String::new();
    archive
        .by_name("package.xml")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert!(manifest.contains("<members>AccountAudit</members>"));
    assert!(manifest.contains("<name>ApexTrigger</name>"));

    let mut meta = String::new();
    archive
        .by_name("triggers/AccountAudit.trigger-meta.xml")
        .unwrap()
        .read_to_string(&mut meta)
        .unwrap();
    assert!(meta.contains("<status>Active</status>"));
    assert!(meta.contains("<apiVersion>58.0</apiVersion>"));
}

#[tokio::test]
async fn test_failed_metadata_deploy_marks_item_error() {
    let api = MockApi::new(common::ok_handler());
    api.push_deploy_result(common::failed_deploy_result(
        "AccountAudit",
        "Compilation failed",
    ));

    let mut items = DeploymentItemMap::new();
    let (key, item) = prepared_item("Account", AutomationType::ApexTrigger, "AccountAudit", true);
    items.insert(key.clone(), item);

    let mut on_batch = |_: &ProgressBatch| {};
    let items = executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    assert_eq!(items[&key].status, DeploymentItemStatus::Error);
    assert_eq!(
        items[&key].deploy_error.as_ref().unwrap(),
        &json!("Compilation failed")
    );
}

#[tokio::test]
async fn test_items_with_retrieve_errors_are_skipped() {
    let api = MockApi::new(common::ok_handler());

    let mut items = DeploymentItemMap::new();
    let (key_ok, item_ok) = prepared_item("Account", AutomationType::ValidationRule, "Rule_A", true);
    let (key_err, mut item_err) =
        prepared_item("Account", AutomationType::ValidationRule, "Rule_B", true);
    item_err.retrieve_error = Some(json!("not found"));
    item_err.status = DeploymentItemStatus::Error;
    items.insert(key_ok.clone(), item_ok);
    items.insert(key_err.clone(), item_err);

    let mut on_batch = |_: &ProgressBatch| {};
    let items = executor::deploy_metadata(&api, items, false, &mut on_batch)
        .await
        .unwrap();

    assert_eq!(items[&key_ok].status, DeploymentItemStatus::Deployed);
    // The errored item was never re-attempted
    assert_eq!(items[&key_err].status, DeploymentItemStatus::Error);
    assert_eq!(*api.composite_sizes.lock().unwrap(), vec![1]);
}

// A transport failure between PATCH batches is pipeline-fatal: the caller
// flips the items still Deploying to Error while items the first batch
// finalized stay Deployed.
#[tokio::test]
async fn test_transport_failure_mid_deploy_marks_in_flight_error() {
    let api = MockApi::new(common::ok_handler());
    api.fail_composite_on_call(1);

    let mut items = DeploymentItemMap::new();
    for i in 0..30 {
        let (key, item) = prepared_item(
            "Account",
            AutomationType::ValidationRule,
            &format!("Rule_{:02}", i),
            true,
        );
        items.insert(key, item);
    }

    let mut tracked = items.clone();
    let mut on_batch = |batch: &ProgressBatch| merge_progress(&mut tracked, batch);
    let result = executor::deploy_metadata(&api, items, false, &mut on_batch).await;
    assert!(result.is_err());

    jetstream_automation::models::deployment::mark_in_flight_error(&mut tracked);

    assert_eq!(
        tracked
            .values()
            .filter(|i| i.status == DeploymentItemStatus::Deployed)
            .count(),
        25
    );
    assert_eq!(
        tracked
            .values()
            .filter(|i| i.status == DeploymentItemStatus::Error)
            .count(),
        5
    );
    assert!(tracked
        .values()
        .filter(|i| i.status == DeploymentItemStatus::Error)
        .all(|i| i.deploy_error.is_none()));
}
