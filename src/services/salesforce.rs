//! Thin Salesforce REST/Tooling API client.
//!
//! Composes URLs and bodies and interprets HTTP status codes; auth is limited
//! to attaching the bearer token, and there is no retry at this layer.

use crate::models::config::OrgConfig;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Salesforce platform limit on sub-requests per composite call.
pub const MAX_COMPOSITE_REQUESTS: usize = 25;

/// SOQL query result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub total_size: u64,
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Value>,
}

/// Composite request envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRequest {
    pub all_or_none: bool,
    pub composite_request: Vec<CompositeSubRequest>,
}

impl CompositeRequest {
    /// A non-transactional composite request: sibling sub-requests proceed
    /// even when one fails.
    pub fn independent(sub_requests: Vec<CompositeSubRequest>) -> Self {
        Self {
            all_or_none: false,
            composite_request: sub_requests,
        }
    }
}

/// One sub-request inside a composite call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSubRequest {
    pub method: String,
    pub url: String,
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CompositeSubRequest {
    pub fn get(url: &str, reference_id: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
            reference_id: reference_id.to_string(),
            body: None,
        }
    }

    pub fn patch(url: &str, reference_id: &str, body: Value) -> Self {
        Self {
            method: "PATCH".to_string(),
            url: url.to_string(),
            reference_id: reference_id.to_string(),
            body: Some(body),
        }
    }
}

/// Composite response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResponse {
    pub composite_response: Vec<CompositeSubResponse>,
}

/// One sub-response inside a composite response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSubResponse {
    #[serde(default)]
    pub body: Option<Value>,
    pub http_status_code: u16,
    pub reference_id: String,
}

impl CompositeSubResponse {
    /// Per-item success check during retrieve: only 2xx counts.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status_code)
    }

    /// Per-item error check during deploy: anything above 299 is recorded as
    /// a deploy error.
    pub fn is_deploy_error(&self) -> bool {
        self.http_status_code > 299
    }
}

/// Options for a file-based Metadata API deploy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOptions {
    pub single_package: bool,
    pub rollback_on_error: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            single_package: true,
            rollback_on_error: true,
        }
    }
}

/// Status of an asynchronous metadata deploy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployJobStatus {
    Pending,
    InProgress,
    Succeeded,
    SucceededPartial,
    Failed,
    Canceling,
    Canceled,
}

/// Result of an asynchronous metadata deploy job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub id: String,
    pub status: DeployJobStatus,
    pub done: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub details: Option<DeployDetails>,
}

/// Component-level deploy outcome details.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployDetails {
    #[serde(default)]
    pub component_failures: Vec<ComponentFailure>,
}

/// One failed component within a metadata deploy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFailure {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub problem: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployRequestResponse {
    id: Option<String>,
    deploy_result: Option<DeployResult>,
}

/// Seam between the pipeline and the org. The shipped implementation is
/// [`RestClient`]; tests substitute a mock.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// Run a SOQL query against the regular or Tooling API.
    async fn query(&self, soql: &str, tooling: bool) -> Result<QueryResult>;

    /// Issue a composite request (max 25 sub-requests).
    async fn composite(&self, request: CompositeRequest, tooling: bool)
        -> Result<CompositeResponse>;

    /// Start an asynchronous file-based metadata deploy; returns the job id.
    async fn deploy_package(&self, zip: Vec<u8>, options: DeployOptions) -> Result<String>;

    /// Check the state of an asynchronous metadata deploy job.
    async fn check_deploy_status(&self, job_id: &str) -> Result<DeployResult>;

    /// API version this connection targets, e.g. `60.0`.
    fn api_version(&self) -> &str;
}

/// Relative URL (as used inside composite sub-requests) for a Tooling sobject
/// record with an explicit field list.
pub fn tooling_sobject_url(api_version: &str, sobject: &str, id: &str, fields: &[&str]) -> String {
    if fields.is_empty() {
        format!(
            "/services/data/v{}/tooling/sobjects/{}/{}",
            api_version, sobject, id
        )
    } else {
        format!(
            "/services/data/v{}/tooling/sobjects/{}/{}?fields={}",
            api_version,
            sobject,
            id,
            fields.join(",")
        )
    }
}

/// reqwest-backed Salesforce client.
pub struct RestClient {
    config: OrgConfig,
    client: reqwest::Client,
}

impl RestClient {
    /// Create a new client for an org connection.
    pub fn new(config: OrgConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new client from environment/config file.
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(OrgConfig::load()?))
    }

    fn base_url(&self, tooling: bool) -> String {
        if tooling {
            format!(
                "{}/services/data/v{}/tooling",
                self.config.instance_url, self.config.api_version
            )
        } else {
            format!(
                "{}/services/data/v{}",
                self.config.instance_url, self.config.api_version
            )
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            "Authorization",
            format!("Bearer {}", self.config.access_token),
        )
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(crate::Error::SessionInvalid);
        }
        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl SalesforceApi for RestClient {
    async fn query(&self, soql: &str, tooling: bool) -> Result<QueryResult> {
        let url = format!(
            "{}/query?q={}",
            self.base_url(tooling),
            urlencoding::encode(soql)
        );
        tracing::debug!("SOQL ({}): {}", if tooling { "tooling" } else { "rest" }, soql);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = self.check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn composite(
        &self,
        request: CompositeRequest,
        tooling: bool,
    ) -> Result<CompositeResponse> {
        let url = format!("{}/composite", self.base_url(tooling));
        tracing::debug!(
            "Composite ({} sub-requests) -> {}",
            request.composite_request.len(),
            url
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await?;
        let response = self.check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn deploy_package(&self, zip: Vec<u8>, options: DeployOptions) -> Result<String> {
        let url = format!("{}/metadata/deployRequest", self.base_url(false));
        let deploy_options = serde_json::json!({ "deployOptions": options });

        let json_part = reqwest::multipart::Part::text(deploy_options.to_string())
            .mime_str("application/json")?;
        let file_part = reqwest::multipart::Part::bytes(zip)
            .file_name("package.zip")
            .mime_str("application/zip")?;
        let form = reqwest::multipart::Form::new()
            .part("json", json_part)
            .part("file", file_part);

        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let body: DeployRequestResponse = response.json().await?;
        body.id
            .or_else(|| body.deploy_result.map(|r| r.id))
            .ok_or_else(|| crate::Error::DeployError("deploy request returned no job id".into()))
    }

    async fn check_deploy_status(&self, job_id: &str) -> Result<DeployResult> {
        let url = format!(
            "{}/metadata/deployRequest/{}?includeDetails=true",
            self.base_url(false),
            job_id
        );

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = self.check_status(response).await?;

        let body: DeployRequestResponse = response.json().await?;
        body.deploy_result
            .ok_or_else(|| crate::Error::DeployError(format!("no deploy result for job {job_id}")))
    }

    fn api_version(&self) -> &str {
        &self.config.api_version
    }
}
