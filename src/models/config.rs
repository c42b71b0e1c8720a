//! Org connection configuration.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Salesforce API version when none is configured.
pub const DEFAULT_API_VERSION: &str = "60.0";

/// Authenticated org connection descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgConfig {
    /// Instance URL, e.g. `https://my-org.my.salesforce.com`.
    pub instance_url: String,
    /// Session or OAuth access token.
    pub access_token: String,
    /// API version, e.g. `60.0`.
    pub api_version: String,
}

impl OrgConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        let instance_url =
            std::env::var("SFDC_INSTANCE_URL").map_err(|_| crate::Error::OrgNotConfigured)?;
        let access_token =
            std::env::var("SFDC_ACCESS_TOKEN").map_err(|_| crate::Error::OrgNotConfigured)?;
        let api_version =
            std::env::var("SFDC_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token,
            api_version,
        })
    }

    /// Load config, preferring environment variables over the config file.
    pub fn load() -> Result<Self> {
        match Self::from_env() {
            Ok(config) => Ok(config),
            Err(_) => Self::from_file(),
        }
    }

    /// Load config from the config file.
    fn from_file() -> Result<Self> {
        let path = config_file_path();
        if !path.exists() {
            return Err(crate::Error::OrgNotConfigured);
        }

        let content = std::fs::read_to_string(&path)?;
        let mut config: OrgConfig = toml::from_str(&content)?;
        config.instance_url = config.instance_url.trim_end_matches('/').to_string();
        if config.api_version.is_empty() {
            config.api_version = DEFAULT_API_VERSION.to_string();
        }
        Ok(config)
    }
}

/// Path to the config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jetstream_automation")
        .join("config.toml")
}
