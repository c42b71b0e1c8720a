//! Shared test helpers: a mock `SalesforceApi` and item builders.
#![allow(dead_code)]

use async_trait::async_trait;
use jetstream_automation::models::automation::{item_key, AutomationType};
use jetstream_automation::models::deployment::{DeploymentItem, DeploymentItemStatus};
use jetstream_automation::services::salesforce::{
    CompositeRequest, CompositeResponse, CompositeSubRequest, CompositeSubResponse,
    ComponentFailure, DeployDetails, DeployJobStatus, DeployOptions, DeployResult, QueryResult,
    SalesforceApi,
};
use jetstream_automation::Result;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub type CompositeHandler = Box<dyn Fn(&CompositeRequest) -> CompositeResponse + Send + Sync>;

/// In-memory Salesforce double that records every call.
pub struct MockApi {
    api_version: String,
    pub query_log: Mutex<Vec<(String, bool)>>,
    pub query_responses: Mutex<VecDeque<QueryResult>>,
    pub composite_sizes: Mutex<Vec<usize>>,
    pub composite_requests: Mutex<Vec<CompositeRequest>>,
    handler: CompositeHandler,
    composite_error_at: Mutex<Option<usize>>,
    pub deploy_results: Mutex<VecDeque<DeployResult>>,
    pub deployed_zips: Mutex<Vec<Vec<u8>>>,
}

impl MockApi {
    pub fn new(handler: CompositeHandler) -> Self {
        Self {
            api_version: "60.0".to_string(),
            query_log: Mutex::new(Vec::new()),
            query_responses: Mutex::new(VecDeque::new()),
            composite_sizes: Mutex::new(Vec::new()),
            composite_requests: Mutex::new(Vec::new()),
            handler,
            composite_error_at: Mutex::new(None),
            deploy_results: Mutex::new(VecDeque::new()),
            deployed_zips: Mutex::new(Vec::new()),
        }
    }

    /// Make the Nth composite call (zero-based) fail with a transport error.
    pub fn fail_composite_on_call(&self, call_index: usize) {
        *self.composite_error_at.lock().unwrap() = Some(call_index);
    }

    pub fn push_query_response(&self, records: Vec<Value>) {
        self.query_responses.lock().unwrap().push_back(QueryResult {
            total_size: records.len() as u64,
            done: true,
            records,
        });
    }

    pub fn push_deploy_result(&self, result: DeployResult) {
        self.deploy_results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl SalesforceApi for MockApi {
    async fn query(&self, soql: &str, tooling: bool) -> Result<QueryResult> {
        self.query_log
            .lock()
            .unwrap()
            .push((soql.to_string(), tooling));
        Ok(self
            .query_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(QueryResult {
                total_size: 0,
                done: true,
                records: Vec::new(),
            }))
    }

    async fn composite(
        &self,
        request: CompositeRequest,
        _tooling: bool,
    ) -> Result<CompositeResponse> {
        let call_index = self.composite_sizes.lock().unwrap().len();
        if *self.composite_error_at.lock().unwrap() == Some(call_index) {
            return Err(jetstream_automation::Error::other("connection reset"));
        }
        self.composite_sizes
            .lock()
            .unwrap()
            .push(request.composite_request.len());
        let response = (self.handler)(&request);
        self.composite_requests.lock().unwrap().push(request);
        Ok(response)
    }

    async fn deploy_package(&self, zip: Vec<u8>, _options: DeployOptions) -> Result<String> {
        self.deployed_zips.lock().unwrap().push(zip);
        Ok("0Af000000000001".to_string())
    }

    async fn check_deploy_status(&self, job_id: &str) -> Result<DeployResult> {
        Ok(self
            .deploy_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DeployResult {
                id: job_id.to_string(),
                status: DeployJobStatus::Succeeded,
                done: true,
                success: true,
                details: None,
            }))
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}

/// Respond to every sub-request with the same status and a body built per
/// sub-request.
pub fn respond_each<F>(request: &CompositeRequest, f: F) -> CompositeResponse
where
    F: Fn(usize, &CompositeSubRequest) -> (u16, Option<Value>),
{
    CompositeResponse {
        composite_response: request
            .composite_request
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                let (status, body) = f(i, sub);
                CompositeSubResponse {
                    body,
                    http_status_code: status,
                    reference_id: sub.reference_id.clone(),
                }
            })
            .collect(),
    }
}

/// Handler answering every composite GET with a retrieved record and every
/// PATCH with 204.
pub fn ok_handler() -> CompositeHandler {
    Box::new(|request| {
        respond_each(request, |_, sub| {
            if sub.method == "PATCH" {
                (204, None)
            } else {
                (
                    200,
                    Some(json!({
                        "FullName": "Retrieved",
                        "Metadata": { "active": false },
                        "Body": "trigger Retrieved on Account (before update) {}",
                        "ApiVersion": 58.0
                    })),
                )
            }
        })
    })
}

/// A failed deploy job naming one component.
pub fn failed_deploy_result(full_name: &str, problem: &str) -> DeployResult {
    DeployResult {
        id: "0Af000000000001".to_string(),
        status: DeployJobStatus::Failed,
        done: true,
        success: false,
        details: Some(DeployDetails {
            component_failures: vec![ComponentFailure {
                full_name: Some(full_name.to_string()),
                problem: Some(problem.to_string()),
            }],
        }),
    }
}

/// A fresh NotStarted deployment item.
pub fn deployment_item(
    sobject: &str,
    automation_type: AutomationType,
    name: &str,
    value: bool,
) -> (String, DeploymentItem) {
    let key = item_key(sobject, automation_type, name);
    let item = DeploymentItem {
        status: DeploymentItemStatus::NotStarted,
        sobject: sobject.to_string(),
        automation_type,
        full_name: name.to_string(),
        record_id: format!("id_{}", name),
        value,
        active_version: None,
        requires_metadata_api: automation_type.requires_metadata_api(),
        metadata_retrieve: None,
        metadata_deploy: None,
        metadata_rollback: None,
        retrieve_error: None,
        deploy_error: None,
    };
    (key, item)
}

/// A deployment item with staged payloads, ready for deploy.
pub fn prepared_item(
    sobject: &str,
    automation_type: AutomationType,
    name: &str,
    value: bool,
) -> (String, DeploymentItem) {
    let (key, mut item) = deployment_item(sobject, automation_type, name, value);
    let retrieved = json!({
        "FullName": name,
        "Metadata": { "active": !value, "status": if value { "Inactive" } else { "Active" } },
        "Body": format!("trigger {} on {} (before update) {{}}", name, sobject),
        "ApiVersion": 58.0
    });
    let mut deploy = retrieved["Metadata"].clone();
    deploy["active"] = Value::from(value);
    deploy["status"] = Value::from(if value { "Active" } else { "Inactive" });

    item.metadata_rollback = Some(retrieved["Metadata"].clone());
    item.metadata_retrieve = Some(retrieved);
    item.metadata_deploy = Some(deploy);
    item.status = DeploymentItemStatus::ReadyForDeploy;
    (key, item)
}
