//! Error types for automation control.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for automation control.
#[derive(Error, Debug)]
pub enum Error {
    // Preflight errors
    #[error("Org not configured. Set SFDC_INSTANCE_URL and SFDC_ACCESS_TOKEN or create a config file")]
    OrgNotConfigured,

    #[error("Org session invalid or expired")]
    SessionInvalid,

    // Fetch errors
    #[error("There were errors obtaining metadata for {0}")]
    MetadataFetch(String),

    #[error("Unknown automation type: {0}")]
    UnknownAutomationType(String),

    // Catalog errors
    #[error("No automation item with key: {0}")]
    ItemNotFound(String),

    // Plan/Deploy errors
    #[error("Invalid plan file: {0}")]
    InvalidPlanFile(String),

    #[error("Plan validation failed: {0}")]
    PlanValidationError(String),

    #[error("Deploy failed: {0}")]
    DeployError(String),

    #[error("Metadata deploy job {0} did not finish within the polling window")]
    DeployTimeout(String),

    // Rollback errors
    #[error("Invalid snapshot file: {0}")]
    InvalidSnapshotFile(String),

    #[error("Nothing to roll back: {0}")]
    NothingToRollback(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Changes file errors
    #[error("Invalid changes file: {0}")]
    Toml(#[from] toml::de::Error),

    // Package errors
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
