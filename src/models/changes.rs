//! Requested-changes file model.
//!
//! The `plan` command reads a TOML file describing which automation items to
//! enable or disable, e.g.:
//!
//! ```toml
//! [[change]]
//! sobject = "Account"
//! type = "validation-rule"
//! name = "Require_Phone"
//! active = true
//!
//! [[change]]
//! sobject = "Contact"
//! type = "flow"
//! name = "Contact_Welcome"
//! active = true
//! version = 3
//! ```

use super::automation::AutomationType;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One requested toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Target object API name.
    pub sobject: String,
    /// Automation type (kebab-case, e.g. `validation-rule`).
    #[serde(rename = "type")]
    pub automation_type: AutomationType,
    /// Metadata full name.
    pub name: String,
    /// Desired active state.
    pub active: bool,
    /// Desired active version (flows only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// Changes file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangesFile {
    #[serde(rename = "change", default)]
    pub changes: Vec<ChangeRequest>,
}

impl ChangesFile {
    /// Distinct objects named by the changes, in file order.
    pub fn sobjects(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for change in &self.changes {
            if !seen.contains(&change.sobject) {
                seen.push(change.sobject.clone());
            }
        }
        seen
    }
}

/// Load a changes file from disk.
pub fn load_changes(path: &Path) -> Result<ChangesFile> {
    let content = std::fs::read_to_string(path)?;
    let changes: ChangesFile = toml::from_str(&content)?;
    Ok(changes)
}
