//! Deployment data model.

use super::automation::AutomationType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Per-item deployment status.
///
/// NotStarted -> Preparing -> {ReadyForDeploy | Error} -> Deploying ->
/// {Deployed | Error} -> [RollingBack -> {RolledBack | Error}]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentItemStatus {
    NotStarted,
    Preparing,
    ReadyForDeploy,
    Deploying,
    Deployed,
    RollingBack,
    RolledBack,
    Error,
}

impl DeploymentItemStatus {
    /// Whether the item is mid-phase; a pipeline-fatal error moves these to
    /// Error while finalized items keep their status.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DeploymentItemStatus::Preparing
                | DeploymentItemStatus::Deploying
                | DeploymentItemStatus::RollingBack
        )
    }

    /// Terminal states (Deployed can still be rolled back).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentItemStatus::Deployed
                | DeploymentItemStatus::RolledBack
                | DeploymentItemStatus::Error
        )
    }
}

impl fmt::Display for DeploymentItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not Started"),
            Self::Preparing => write!(f, "Preparing"),
            Self::ReadyForDeploy => write!(f, "Ready for Deploy"),
            Self::Deploying => write!(f, "Deploying"),
            Self::Deployed => write!(f, "Deployed"),
            Self::RollingBack => write!(f, "Rolling Back"),
            Self::RolledBack => write!(f, "Rolled Back"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// One pending deployment operation, derived from a dirty catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentItem {
    /// Current status in the deployment state machine.
    pub status: DeploymentItemStatus,
    /// Target object API name.
    pub sobject: String,
    /// Automation type.
    pub automation_type: AutomationType,
    /// Metadata full name.
    pub full_name: String,
    /// Salesforce record id to retrieve/patch.
    pub record_id: String,
    /// Desired active state.
    pub value: bool,
    /// Desired active version (flows only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_version: Option<u32>,
    /// Whether this item must go through a file-based Metadata API deploy.
    pub requires_metadata_api: bool,
    /// Raw record retrieved during prepare (includes `Metadata`, and
    /// `Body`/`ApiVersion` for triggers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_retrieve: Option<Value>,
    /// Metadata payload to deploy; mutated from the retrieved value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_deploy: Option<Value>,
    /// Pristine copy of the retrieved metadata, preserved for rollback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_rollback: Option<Value>,
    /// Error body from a failed composite GET during prepare.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieve_error: Option<Value>,
    /// Error body from a failed PATCH or file-based deploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_error: Option<Value>,
}

/// Keyed map of pending deployment operations. Ordered so batches are issued
/// deterministically.
pub type DeploymentItemMap = BTreeMap<String, DeploymentItem>;

/// Progress event payload: the items updated by one status transition, one
/// composite batch or one file-based deploy job. Consumers merge into their
/// own map by key, last write wins.
pub type ProgressBatch = Vec<(String, DeploymentItem)>;

/// Progress sink invoked once when a phase marks items in-flight and once per
/// batch, in issue order.
pub type ProgressSink<'a> = &'a mut dyn FnMut(&ProgressBatch);

/// Merge a progress batch into a map, last-write-wins per key.
pub fn merge_progress(map: &mut DeploymentItemMap, batch: &ProgressBatch) {
    for (key, item) in batch {
        map.insert(key.clone(), item.clone());
    }
}

/// After a pipeline-fatal error, move every item still mid-phase to Error.
/// Already-finalized items keep their status.
pub fn mark_in_flight_error(map: &mut DeploymentItemMap) {
    for item in map.values_mut() {
        if item.status.is_in_flight() {
            item.status = DeploymentItemStatus::Error;
        }
    }
}

/// Plan file structure, persisted between the plan and deploy phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Plan format version.
    pub version: String,
    /// Unique plan id.
    pub plan_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Org API version the plan was built against.
    pub api_version: String,
    /// Pending deployment items, keyed by catalog key.
    pub items: DeploymentItemMap,
}

impl DeploymentPlan {
    pub fn new(api_version: &str, items: DeploymentItemMap) -> Self {
        Self {
            version: "1.0".to_string(),
            plan_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            api_version: api_version.to_string(),
            items,
        }
    }

    /// Count items per status, for summaries.
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in self.items.values() {
            *counts.entry(item.status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
