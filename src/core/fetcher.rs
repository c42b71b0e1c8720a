//! Metadata fetcher.
//!
//! Retrieves declarative-automation records per object. Ordinary types are a
//! single SOQL query plus composite GET batches for the `FullName`/`Metadata`
//! fields (not queryable with multiple rows). Flows have no per-object query,
//! so the first flow fetch scans all org flow definitions and caches the
//! per-object grouping for subsequent calls.
//!
//! Any non-200 composite sub-response aborts the whole fetch; there is no
//! per-item retry here (the caller re-invokes the fetch).

use crate::models::automation::{
    item_key, AutomationItem, AutomationType, FlowDefinitionSummary,
};
use crate::services::salesforce::{
    tooling_sobject_url, CompositeRequest, CompositeSubRequest, SalesforceApi,
    MAX_COMPOSITE_REQUESTS,
};
use crate::services::soql;
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Org-wide flow definition cache, keyed by target object. Populated once by
/// the first flow fetch and reused across calls.
#[derive(Debug, Clone, Default)]
pub struct FlowCache {
    populated: bool,
    by_sobject: HashMap<String, Vec<FlowDefinitionSummary>>,
}

impl FlowCache {
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Cached definitions for one object.
    pub fn definitions_for(&self, sobject: &str) -> &[FlowDefinitionSummary] {
        self.by_sobject
            .get(sobject)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }
}

/// Fetches automation metadata for catalog construction.
pub struct MetadataFetcher<'a, A: SalesforceApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: SalesforceApi + ?Sized> MetadataFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Fetch all items of one type for one object.
    pub async fn fetch(
        &self,
        sobject: &str,
        automation_type: AutomationType,
        flow_cache: &mut FlowCache,
    ) -> Result<Vec<AutomationItem>> {
        match automation_type {
            AutomationType::Flow => self.fetch_flows(sobject, flow_cache).await,
            _ => self.fetch_rule_like(sobject, automation_type).await,
        }
    }

    /// Fetch for validation rules, workflow rules, Apex triggers and
    /// assignment rules: one SOQL query, then composite GETs for metadata.
    async fn fetch_rule_like(
        &self,
        sobject: &str,
        automation_type: AutomationType,
    ) -> Result<Vec<AutomationItem>> {
        let soql = soql::query_for_type(automation_type, sobject)
            .ok_or_else(|| crate::Error::UnknownAutomationType(automation_type.to_string()))?;
        // Assignment rules live on the regular API; everything else is Tooling.
        let use_tooling = automation_type != AutomationType::AssignmentRule;

        let result = self.api.query(&soql, use_tooling).await?;
        tracing::debug!(
            "{} {} record(s) for {}",
            result.records.len(),
            automation_type,
            sobject
        );
        if result.records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = result
            .records
            .iter()
            .filter_map(|r| json_str(r, "Id"))
            .collect();
        let metadata_records = self
            .fetch_metadata_records(automation_type.tooling_sobject(), &ids, &[])
            .await
            .map_err(|e| {
                tracing::error!("Metadata fetch failed for {}: {}", sobject, e);
                crate::Error::MetadataFetch(sobject.to_string())
            })?;

        let items = result
            .records
            .iter()
            .zip(metadata_records.iter())
            .map(|(record, meta_record)| {
                build_item(sobject, automation_type, record, meta_record)
            })
            .collect();
        Ok(items)
    }

    /// Fetch flows for one object, populating the org-wide cache on first use.
    pub async fn fetch_flows(
        &self,
        sobject: &str,
        cache: &mut FlowCache,
    ) -> Result<Vec<AutomationItem>> {
        if !cache.is_populated() {
            self.populate_flow_cache(cache).await?;
        }

        let relevant: Vec<String> = cache
            .definitions_for(sobject)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        if relevant.is_empty() {
            return Ok(Vec::new());
        }

        let metadata_records = self
            .fetch_metadata_records("FlowDefinition", &relevant, &[])
            .await
            .map_err(|_| crate::Error::MetadataFetch(sobject.to_string()))?;

        let items = metadata_records
            .iter()
            .map(|record| build_flow_item(sobject, record))
            .collect();
        Ok(items)
    }

    /// Org-wide scan: query every flow definition, retrieve its metadata in
    /// composite batches, and group definitions by target object.
    async fn populate_flow_cache(&self, cache: &mut FlowCache) -> Result<()> {
        tracing::info!("Scanning org-wide flow definitions");
        let result = self.api.query(&soql::flow_definitions_query(), true).await?;
        let ids: Vec<String> = result
            .records
            .iter()
            .filter_map(|r| json_str(r, "Id"))
            .collect();

        if !ids.is_empty() {
            let metadata_records = self
                .fetch_metadata_records("FlowDefinition", &ids, &[])
                .await
                .map_err(|_| crate::Error::MetadataFetch("FlowDefinition".to_string()))?;

            for record in &metadata_records {
                let target = flow_target_object(record);
                let summary = FlowDefinitionSummary {
                    id: json_str(record, "Id").unwrap_or_default(),
                    developer_name: json_str(record, "FullName")
                        .or_else(|| json_str(record, "DeveloperName"))
                        .unwrap_or_default(),
                    sobject: target.clone(),
                };
                let bucket = target.unwrap_or_default();
                cache.by_sobject.entry(bucket).or_default().push(summary);
            }
        }

        cache.populated = true;
        tracing::info!(
            "Flow cache populated: {} object group(s)",
            cache.by_sobject.len()
        );
        Ok(())
    }

    /// Composite GET batches (max 25) for `FullName`/`Metadata` plus any
    /// extra fields. Returns one record body per id, in input order. Any
    /// non-200 sub-response fails the whole call.
    async fn fetch_metadata_records(
        &self,
        tooling_sobject: &str,
        ids: &[String],
        extra_fields: &[&str],
    ) -> Result<Vec<Value>> {
        let mut fields = vec!["FullName", "Metadata"];
        fields.extend_from_slice(extra_fields);

        let mut bodies = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MAX_COMPOSITE_REQUESTS) {
            let sub_requests: Vec<CompositeSubRequest> = batch
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let url =
                        tooling_sobject_url(self.api.api_version(), tooling_sobject, id, &fields);
                    CompositeSubRequest::get(&url, &format!("ref_{}", i))
                })
                .collect();

            let response = self
                .api
                .composite(CompositeRequest::independent(sub_requests), true)
                .await?;

            for sub in &response.composite_response {
                if !sub.is_success() {
                    return Err(crate::Error::MetadataFetch(tooling_sobject.to_string()));
                }
                bodies.push(sub.body.clone().unwrap_or(Value::Null));
            }
        }
        Ok(bodies)
    }
}

/// Build a catalog item for a non-flow type from its query record and its
/// composite GET body.
fn build_item(
    sobject: &str,
    automation_type: AutomationType,
    record: &Value,
    meta_record: &Value,
) -> AutomationItem {
    let metadata = &meta_record["Metadata"];
    let full_name = json_str(meta_record, "FullName")
        .or_else(|| json_str(record, "Name"))
        .or_else(|| json_str(record, "ValidationName"))
        .unwrap_or_default();
    let label = json_str(record, "ValidationName")
        .or_else(|| json_str(record, "Name"))
        .unwrap_or_else(|| full_name.clone());

    let active = match automation_type {
        AutomationType::ApexTrigger => {
            json_str(record, "Status").as_deref() == Some("Active")
        }
        _ => metadata["active"]
            .as_bool()
            .or_else(|| record["Active"].as_bool())
            .unwrap_or(false),
    };

    let mut merged = record.clone();
    if let (Some(merged_map), Some(meta_map)) = (merged.as_object_mut(), meta_record.as_object()) {
        for (k, v) in meta_map {
            merged_map.insert(k.clone(), v.clone());
        }
    }

    AutomationItem {
        key: item_key(sobject, automation_type, &full_name),
        sobject: sobject.to_string(),
        automation_type,
        full_name,
        label,
        description: json_str(record, "Description").or_else(|| json_str(metadata, "description")),
        initial_active: active,
        current_active: active,
        initial_active_version: None,
        current_active_version: None,
        last_modified_by: record["LastModifiedBy"]["Name"].as_str().map(String::from),
        last_modified_date: json_str(record, "LastModifiedDate"),
        record_id: json_str(record, "Id").unwrap_or_default(),
        record: merged,
    }
}

/// Build a catalog item for one flow definition from its composite GET body.
fn build_flow_item(sobject: &str, record: &Value) -> AutomationItem {
    let metadata = &record["Metadata"];
    let full_name = json_str(record, "FullName")
        .or_else(|| json_str(record, "DeveloperName"))
        .unwrap_or_default();
    let active_version = metadata["activeVersionNumber"]
        .as_u64()
        .map(|v| v as u32);

    AutomationItem {
        key: item_key(sobject, AutomationType::Flow, &full_name),
        sobject: sobject.to_string(),
        automation_type: AutomationType::Flow,
        full_name: full_name.clone(),
        label: json_str(metadata, "masterLabel").unwrap_or(full_name),
        description: json_str(metadata, "description"),
        initial_active: active_version.is_some(),
        current_active: active_version.is_some(),
        initial_active_version: active_version,
        current_active_version: active_version,
        last_modified_by: record["LastModifiedBy"]["Name"].as_str().map(String::from),
        last_modified_date: json_str(record, "LastModifiedDate"),
        record_id: json_str(record, "Id").unwrap_or_default(),
        record: record.clone(),
    }
}

/// The object a flow is attached to, when one can be determined from its
/// metadata (process builders carry an `ObjectType` process metadata value,
/// record-triggered flows a `start.object`).
pub fn flow_target_object(record: &Value) -> Option<String> {
    let metadata = &record["Metadata"];

    if let Some(values) = metadata["processMetadataValues"].as_array() {
        for value in values {
            if value["name"].as_str() == Some("ObjectType") {
                if let Some(name) = value["value"]["stringValue"].as_str() {
                    return Some(name.to_string());
                }
            }
        }
    }

    metadata["start"]["object"].as_str().map(String::from)
}

fn json_str(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(String::from)
}
