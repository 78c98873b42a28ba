//! Publisher trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Static site publisher abstraction
///
/// Every publish strategy (direct upload, delegated deploy script) takes a
/// directory of generated files and returns where it ended up. Credentials
/// and transport settings are given to the implementation at construction
/// time.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the strategy name (e.g., "direct-upload", "script")
    fn name(&self) -> &str;

    /// Returns the Pages project this publisher deploys to
    fn project(&self) -> &str;

    /// Publish every file under `directory`
    async fn publish(&self, directory: &Path) -> Result<PublishOutcome>;
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Public URL of the deployment
    pub url: String,

    /// Deployment id, when the strategy reports one
    pub deployment_id: Option<String>,
}

impl PublishOutcome {
    pub fn new(url: impl Into<String>, deployment_id: Option<String>) -> Self {
        Self {
            url: url.into(),
            deployment_id,
        }
    }
}

/// Fallback URL used when the service does not report one
pub fn default_pages_url(project: &str) -> String {
    format!("https://{}.pages.dev", project)
}
