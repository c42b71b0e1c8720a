//! Org configuration and connectivity checks.

use super::CheckResult;
use crate::models::config::OrgConfig;
use crate::services::salesforce::{RestClient, SalesforceApi};

/// Check that an org connection is configured.
pub fn check_config(results: &mut Vec<CheckResult>) -> Option<OrgConfig> {
    match OrgConfig::load() {
        Ok(config) => {
            results.push(CheckResult::passed(
                "Org config",
                format!("{} (API v{})", config.instance_url, config.api_version),
            ));
            Some(config)
        }
        Err(_) => {
            results.push(CheckResult::failed(
                "Org config",
                "No org connection configured",
                "Set SFDC_INSTANCE_URL and SFDC_ACCESS_TOKEN, or create the config file",
            ));
            None
        }
    }
}

/// Check that the org is reachable and the session is valid.
pub async fn check_connection(config: OrgConfig) -> CheckResult {
    let client = RestClient::new(config);
    match client
        .query("SELECT Id, Name FROM Organization LIMIT 1", false)
        .await
    {
        Ok(result) => {
            let org_name = result
                .records
                .first()
                .and_then(|r| r["Name"].as_str())
                .unwrap_or("org");
            CheckResult::passed("Org connection", format!("Connected to {}", org_name))
        }
        Err(crate::Error::SessionInvalid) => CheckResult::failed(
            "Org connection",
            "Session invalid or expired",
            "Refresh your access token and try again",
        ),
        Err(e) => CheckResult::failed(
            "Org connection",
            format!("Could not reach org: {}", e),
            "Check the instance URL and your network connection",
        ),
    }
}
