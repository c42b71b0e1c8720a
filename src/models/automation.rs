//! Automation item data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of declarative automation that can be toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationType {
    ValidationRule,
    WorkflowRule,
    Flow,
    ApexTrigger,
    AssignmentRule,
}

impl AutomationType {
    /// All supported automation types, in display order.
    pub const ALL: [AutomationType; 5] = [
        AutomationType::ValidationRule,
        AutomationType::WorkflowRule,
        AutomationType::Flow,
        AutomationType::ApexTrigger,
        AutomationType::AssignmentRule,
    ];

    /// Types that cannot be toggled with a Tooling API PATCH and must go
    /// through a file-based Metadata API deploy instead.
    pub const REQUIRE_METADATA_API: [AutomationType; 1] = [AutomationType::ApexTrigger];

    /// Whether this type requires a file-based Metadata API deploy.
    pub fn requires_metadata_api(&self) -> bool {
        Self::REQUIRE_METADATA_API.contains(self)
    }

    /// The Tooling API sobject holding records of this type.
    pub fn tooling_sobject(&self) -> &'static str {
        match self {
            AutomationType::ValidationRule => "ValidationRule",
            AutomationType::WorkflowRule => "WorkflowRule",
            AutomationType::Flow => "FlowDefinition",
            AutomationType::ApexTrigger => "ApexTrigger",
            AutomationType::AssignmentRule => "AssignmentRule",
        }
    }
}

impl std::str::FromStr for AutomationType {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "validation-rule" => Ok(AutomationType::ValidationRule),
            "workflow-rule" => Ok(AutomationType::WorkflowRule),
            "flow" => Ok(AutomationType::Flow),
            "apex-trigger" => Ok(AutomationType::ApexTrigger),
            "assignment-rule" => Ok(AutomationType::AssignmentRule),
            other => Err(crate::Error::UnknownAutomationType(other.to_string())),
        }
    }
}

impl fmt::Display for AutomationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationType::ValidationRule => write!(f, "Validation Rule"),
            AutomationType::WorkflowRule => write!(f, "Workflow Rule"),
            AutomationType::Flow => write!(f, "Flow / Process Builder"),
            AutomationType::ApexTrigger => write!(f, "Apex Trigger"),
            AutomationType::AssignmentRule => write!(f, "Assignment Rule"),
        }
    }
}

/// Build the catalog key for an item: object, type and full name together
/// identify one controllable unit.
pub fn item_key(sobject: &str, automation_type: AutomationType, full_name: &str) -> String {
    format!("{}|{}|{}", sobject, automation_type.tooling_sobject(), full_name)
}

/// One controllable unit of automation.
///
/// `initial_*` fields reflect the org state at fetch time and never change
/// afterwards; only `current_*` fields move under user toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationItem {
    /// Catalog key (`sobject|type|full_name`), unique within a catalog.
    pub key: String,
    /// Target object API name. Empty for flows not tied to an object.
    pub sobject: String,
    /// Automation type.
    pub automation_type: AutomationType,
    /// Metadata full name.
    pub full_name: String,
    /// Display label.
    pub label: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Active state at fetch time.
    pub initial_active: bool,
    /// Active state after user toggles.
    pub current_active: bool,
    /// Active flow version at fetch time (flows only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_active_version: Option<u32>,
    /// Desired active flow version (flows only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_active_version: Option<u32>,
    /// Last modified by, when the org returned it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    /// Last modified date, when the org returned it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    /// Salesforce record id.
    pub record_id: String,
    /// Raw Salesforce record, kept for review display.
    pub record: Value,
}

impl AutomationItem {
    /// Whether the current state diverges from the initial state.
    pub fn is_dirty(&self) -> bool {
        self.current_active != self.initial_active
            || self.current_active_version != self.initial_active_version
    }
}

/// Per-type load bookkeeping: each automation type is fetched independently
/// and lazily, so each carries its own flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeLoadState {
    pub has_loaded: bool,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Catalog entry grouping automation items by target object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentSobject {
    /// Object API name.
    pub sobject: String,
    /// Load state per automation type.
    pub load_state: BTreeMap<AutomationType, TypeLoadState>,
}

impl ParentSobject {
    pub fn new(sobject: &str) -> Self {
        Self {
            sobject: sobject.to_string(),
            load_state: BTreeMap::new(),
        }
    }
}

/// Cached summary of one org flow definition, keyed by target object in the
/// fetcher's org-wide flow cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinitionSummary {
    pub id: String,
    pub developer_name: String,
    /// Object the flow is attached to, when one could be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sobject: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key_format() {
        let key = item_key("Account", AutomationType::ValidationRule, "Require_Phone");
        assert_eq!(key, "Account|ValidationRule|Require_Phone");
    }

    #[test]
    fn test_requires_metadata_api() {
        assert!(AutomationType::ApexTrigger.requires_metadata_api());
        assert!(!AutomationType::ValidationRule.requires_metadata_api());
        assert!(!AutomationType::Flow.requires_metadata_api());
    }

    #[test]
    fn test_dirty_detection() {
        let mut item = AutomationItem {
            key: item_key("Account", AutomationType::Flow, "My_Flow"),
            sobject: "Account".to_string(),
            automation_type: AutomationType::Flow,
            full_name: "My_Flow".to_string(),
            label: "My Flow".to_string(),
            description: None,
            initial_active: true,
            current_active: true,
            initial_active_version: Some(3),
            current_active_version: Some(3),
            last_modified_by: None,
            last_modified_date: None,
            record_id: "301000000000001".to_string(),
            record: serde_json::json!({}),
        };
        assert!(!item.is_dirty());

        // A version change alone makes a flow dirty
        item.current_active_version = Some(2);
        assert!(item.is_dirty());
    }

    #[test]
    fn test_automation_type_serde_kebab() {
        let json = serde_json::to_string(&AutomationType::ValidationRule).unwrap();
        assert_eq!(json, "\"validation-rule\"");
        let parsed: AutomationType = serde_json::from_str("\"apex-trigger\"").unwrap();
        assert_eq!(parsed, AutomationType::ApexTrigger);
    }
}
