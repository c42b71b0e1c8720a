//! SOQL query composition.
//!
//! A small structured builder plus the canned per-automation-type queries the
//! metadata fetcher issues. `FullName` and `Metadata` are not queryable with
//! multiple rows, so these queries fetch the plain fields and the fetcher
//! follows up with composite GETs.

use crate::models::automation::AutomationType;

/// Structured SOQL query descriptor.
#[derive(Debug, Clone, Default)]
pub struct Query {
    fields: Vec<String>,
    from: String,
    conditions: Vec<String>,
    order_by: Option<String>,
    limit: Option<u32>,
}

impl Query {
    pub fn select(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn from(mut self, sobject: &str) -> Self {
        self.from = sobject.to_string();
        self
    }

    /// Add a condition; multiple conditions are AND-ed.
    pub fn where_clause(mut self, condition: &str) -> Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// Add an equality condition against a quoted string literal.
    pub fn where_eq(self, field: &str, value: &str) -> Self {
        let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
        self.where_clause(&format!("{} = '{}'", field, escaped))
    }

    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by = Some(clause.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compose the final query string.
    pub fn compose(&self) -> String {
        let mut soql = format!("SELECT {} FROM {}", self.fields.join(", "), self.from);
        if !self.conditions.is_empty() {
            soql.push_str(" WHERE ");
            soql.push_str(&self.conditions.join(" AND "));
        }
        if let Some(ref order_by) = self.order_by {
            soql.push_str(" ORDER BY ");
            soql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            soql.push_str(&format!(" LIMIT {}", limit));
        }
        soql
    }
}

/// Query for an object's validation rules (Tooling API).
pub fn validation_rules_query(sobject: &str) -> String {
    Query::select(&[
        "Id",
        "Active",
        "Description",
        "ErrorDisplayField",
        "ErrorMessage",
        "ValidationName",
        "LastModifiedDate",
        "LastModifiedBy.Name",
    ])
    .from("ValidationRule")
    .where_eq("EntityDefinition.QualifiedApiName", sobject)
    .order_by("ValidationName")
    .compose()
}

/// Query for an object's workflow rules (Tooling API).
pub fn workflow_rules_query(sobject: &str) -> String {
    Query::select(&["Id", "Name", "TableEnumOrId", "LastModifiedDate", "LastModifiedBy.Name"])
        .from("WorkflowRule")
        .where_eq("TableEnumOrId", sobject)
        .order_by("Name")
        .compose()
}

/// Query for an object's Apex triggers (Tooling API). Managed triggers are
/// excluded since they cannot be redeployed.
pub fn apex_triggers_query(sobject: &str) -> String {
    Query::select(&[
        "Id",
        "Name",
        "Status",
        "ApiVersion",
        "LastModifiedDate",
        "LastModifiedBy.Name",
    ])
    .from("ApexTrigger")
    .where_eq("EntityDefinition.QualifiedApiName", sobject)
    .where_eq("ManageableState", "unmanaged")
    .order_by("Name")
    .compose()
}

/// Query for an object's assignment rules (regular API).
pub fn assignment_rules_query(sobject: &str) -> String {
    Query::select(&["Id", "Name", "Active", "SobjectType", "LastModifiedDate"])
        .from("AssignmentRule")
        .where_eq("SobjectType", sobject)
        .order_by("Name")
        .compose()
}

/// Org-wide flow definition scan (Tooling API). There is no cheap way to
/// query flows by object, so the fetcher retrieves all of them once and
/// caches the per-object grouping.
pub fn flow_definitions_query() -> String {
    Query::select(&[
        "Id",
        "DeveloperName",
        "ActiveVersionId",
        "LatestVersionId",
        "LastModifiedDate",
        "LastModifiedBy.Name",
    ])
    .from("FlowDefinition")
    .order_by("DeveloperName")
    .compose()
}

/// The fetch query for a given automation type against a given object.
/// Returns `None` for flows, which use the org-wide scan instead.
pub fn query_for_type(automation_type: AutomationType, sobject: &str) -> Option<String> {
    match automation_type {
        AutomationType::ValidationRule => Some(validation_rules_query(sobject)),
        AutomationType::WorkflowRule => Some(workflow_rules_query(sobject)),
        AutomationType::ApexTrigger => Some(apex_triggers_query(sobject)),
        AutomationType::AssignmentRule => Some(assignment_rules_query(sobject)),
        AutomationType::Flow => None,
    }
}
