//! Automation item catalog.
//!
//! In-memory collection of automation items grouped by target object. The
//! catalog owns the initial/current split: initial state is fixed at insert
//! time and only current state moves under explicit toggles. The planner and
//! executor never mutate the catalog; results are merged back by the caller.

use crate::models::automation::{AutomationItem, AutomationType, ParentSobject, TypeLoadState};
use crate::Result;
use std::collections::BTreeMap;

/// Catalog of automation items for the review's duration.
#[derive(Debug, Clone, Default)]
pub struct AutomationCatalog {
    parents: BTreeMap<String, ParentSobject>,
    items: BTreeMap<String, AutomationItem>,
}

impl AutomationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object before its types are fetched.
    pub fn add_sobject(&mut self, sobject: &str) {
        self.parents
            .entry(sobject.to_string())
            .or_insert_with(|| ParentSobject::new(sobject));
    }

    /// Mark one (object, type) pair as loading.
    pub fn mark_loading(&mut self, sobject: &str, automation_type: AutomationType) {
        self.add_sobject(sobject);
        if let Some(parent) = self.parents.get_mut(sobject) {
            let state = parent.load_state.entry(automation_type).or_default();
            state.loading = true;
            state.error = None;
        }
    }

    /// Record a fetch failure for one (object, type) pair.
    pub fn mark_load_error(&mut self, sobject: &str, automation_type: AutomationType, error: &str) {
        self.add_sobject(sobject);
        if let Some(parent) = self.parents.get_mut(sobject) {
            let state = parent.load_state.entry(automation_type).or_default();
            state.loading = false;
            state.error = Some(error.to_string());
        }
    }

    /// Insert fetched items for one (object, type) pair, marking it loaded.
    ///
    /// Keys are unique within the catalog: re-inserting a key replaces the
    /// prior item (a fresh fetch supersedes a stale one).
    pub fn insert_items(
        &mut self,
        sobject: &str,
        automation_type: AutomationType,
        items: Vec<AutomationItem>,
    ) {
        self.add_sobject(sobject);
        if let Some(parent) = self.parents.get_mut(sobject) {
            parent.load_state.insert(
                automation_type,
                TypeLoadState {
                    has_loaded: true,
                    loading: false,
                    error: None,
                },
            );
        }
        for item in items {
            self.items.insert(item.key.clone(), item);
        }
    }

    /// Toggle an item's current state. Never touches initial state.
    pub fn toggle(&mut self, key: &str, active: bool, version: Option<u32>) -> Result<()> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| crate::Error::ItemNotFound(key.to_string()))?;

        item.current_active = active;
        if item.automation_type == AutomationType::Flow {
            item.current_active_version = if active {
                version.or(item.current_active_version).or(item.initial_active_version)
            } else {
                None
            };
        }
        tracing::debug!("Toggled {} -> active={}", key, active);
        Ok(())
    }

    pub fn item(&self, key: &str) -> Option<&AutomationItem> {
        self.items.get(key)
    }

    /// Resolve a user-supplied name to a catalog key. `FullName` may be
    /// object-qualified (e.g. `Account.Require_Phone`), so bare names and
    /// labels match too.
    pub fn resolve_key(
        &self,
        sobject: &str,
        automation_type: AutomationType,
        name: &str,
    ) -> Option<String> {
        let qualified_suffix = format!(".{}", name);
        self.items
            .values()
            .find(|item| {
                item.sobject == sobject
                    && item.automation_type == automation_type
                    && (item.full_name == name
                        || item.full_name.ends_with(&qualified_suffix)
                        || item.label == name)
            })
            .map(|item| item.key.clone())
    }

    pub fn items(&self) -> impl Iterator<Item = &AutomationItem> {
        self.items.values()
    }

    /// Items for one object, in key order.
    pub fn items_for_sobject<'a>(&'a self, sobject: &'a str) -> impl Iterator<Item = &'a AutomationItem> {
        self.items.values().filter(move |i| i.sobject == sobject)
    }

    /// Items whose current state diverges from their initial state.
    pub fn dirty_items(&self) -> Vec<&AutomationItem> {
        self.items.values().filter(|i| i.is_dirty()).collect()
    }

    pub fn sobjects(&self) -> impl Iterator<Item = &ParentSobject> {
        self.parents.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Load state for one (object, type) pair, if known.
    pub fn load_state(
        &self,
        sobject: &str,
        automation_type: AutomationType,
    ) -> Option<&TypeLoadState> {
        self.parents
            .get(sobject)
            .and_then(|p| p.load_state.get(&automation_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::item_key;

    fn sample_item(sobject: &str, name: &str, active: bool) -> AutomationItem {
        AutomationItem {
            key: item_key(sobject, AutomationType::ValidationRule, name),
            sobject: sobject.to_string(),
            automation_type: AutomationType::ValidationRule,
            full_name: name.to_string(),
            label: name.to_string(),
            description: None,
            initial_active: active,
            current_active: active,
            initial_active_version: None,
            current_active_version: None,
            last_modified_by: None,
            last_modified_date: None,
            record_id: "03d000000000001".to_string(),
            record: serde_json::json!({}),
        }
    }

    #[test]
    fn test_toggle_leaves_initial_untouched() {
        let mut catalog = AutomationCatalog::new();
        catalog.insert_items(
            "Account",
            AutomationType::ValidationRule,
            vec![sample_item("Account", "Require_Phone", false)],
        );

        let key = item_key("Account", AutomationType::ValidationRule, "Require_Phone");
        catalog.toggle(&key, true, None).unwrap();

        let item = catalog.item(&key).unwrap();
        assert!(!item.initial_active);
        assert!(item.current_active);
        assert!(item.is_dirty());

        // Toggling back makes it clean again
        catalog.toggle(&key, false, None).unwrap();
        assert!(!catalog.item(&key).unwrap().is_dirty());
    }

    #[test]
    fn test_dirty_items_only_changed() {
        let mut catalog = AutomationCatalog::new();
        catalog.insert_items(
            "Account",
            AutomationType::ValidationRule,
            vec![
                sample_item("Account", "Rule_A", false),
                sample_item("Account", "Rule_B", true),
            ],
        );

        let key = item_key("Account", AutomationType::ValidationRule, "Rule_A");
        catalog.toggle(&key, true, None).unwrap();

        let dirty = catalog.dirty_items();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].full_name, "Rule_A");
    }

    #[test]
    fn test_toggle_unknown_key_fails() {
        let mut catalog = AutomationCatalog::new();
        let result = catalog.toggle("Account|ValidationRule|Missing", true, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_state_tracking() {
        let mut catalog = AutomationCatalog::new();
        catalog.mark_loading("Account", AutomationType::WorkflowRule);
        assert!(
            catalog
                .load_state("Account", AutomationType::WorkflowRule)
                .unwrap()
                .loading
        );

        catalog.insert_items("Account", AutomationType::WorkflowRule, vec![]);
        let state = catalog
            .load_state("Account", AutomationType::WorkflowRule)
            .unwrap();
        assert!(state.has_loaded);
        assert!(!state.loading);

        catalog.mark_load_error("Account", AutomationType::Flow, "boom");
        assert_eq!(
            catalog
                .load_state("Account", AutomationType::Flow)
                .unwrap()
                .error
                .as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_reinsert_replaces_by_key() {
        let mut catalog = AutomationCatalog::new();
        catalog.insert_items(
            "Account",
            AutomationType::ValidationRule,
            vec![sample_item("Account", "Rule_A", false)],
        );
        catalog.insert_items(
            "Account",
            AutomationType::ValidationRule,
            vec![sample_item("Account", "Rule_A", true)],
        );
        assert_eq!(catalog.len(), 1);
        let key = item_key("Account", AutomationType::ValidationRule, "Rule_A");
        assert!(catalog.item(&key).unwrap().initial_active);
    }
}
