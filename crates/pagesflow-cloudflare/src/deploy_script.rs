//! Deploy script publisher
//!
//! Hands the whole publish over to an external executable, usually a shell
//! wrapper around `wrangler pages deploy`. The script is called as
//! `<script> <directory> <account_id> <api_token> <project>` and must print
//! a `DEPLOYMENT_URL=<url>` line and exit 0.

use async_trait::async_trait;
use pagesflow_config::{Credentials, DeployConfig, ENV_DEPLOY_SCRIPT};
use pagesflow_core::{PublishError, PublishOutcome, Publisher, Result, check_script};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub const URL_MARKER: &str = "DEPLOYMENT_URL=";
pub const ID_MARKER: &str = "DEPLOYMENT_ID=";

/// External deploy script wrapper
pub struct ScriptPublisher {
    script: PathBuf,
    credentials: Credentials,
}

impl ScriptPublisher {
    pub fn new(script: impl Into<PathBuf>, credentials: Credentials) -> Self {
        Self {
            script: script.into(),
            credentials,
        }
    }

    pub fn from_config(config: &DeployConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let script = config
            .script_path
            .clone()
            .ok_or_else(|| PublishError::ConfigurationMissing(ENV_DEPLOY_SCRIPT.to_string()))?;
        Ok(Self::new(script, credentials))
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Run the script, returning stdout followed by stderr
    async fn run(&self, directory: &Path) -> Result<(std::process::ExitStatus, String)> {
        tracing::debug!(
            "Running: {} {} {} *** {}",
            self.script.display(),
            directory.display(),
            self.credentials.account_id,
            self.credentials.project_name
        );

        let output = Command::new(&self.script)
            .arg(directory)
            .arg(&self.credentials.account_id)
            .arg(&self.credentials.api_token)
            .arg(&self.credentials.project_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((output.status, combined))
    }
}

#[async_trait]
impl Publisher for ScriptPublisher {
    fn name(&self) -> &str {
        "script"
    }

    fn project(&self) -> &str {
        &self.credentials.project_name
    }

    async fn publish(&self, directory: &Path) -> Result<PublishOutcome> {
        check_script(&self.script).await?;

        let (status, output) = self.run(directory).await?;
        if !status.success() {
            return Err(PublishError::Subprocess {
                code: status.code(),
                output,
            });
        }

        let Some(url) = parse_marker(&output, URL_MARKER) else {
            return Err(PublishError::MissingOutput { output });
        };
        let deployment_id = parse_marker(&output, ID_MARKER);

        tracing::info!("Deploy script finished: {}", url);
        Ok(PublishOutcome::new(url, deployment_id))
    }
}

/// Value of the last `<marker><value>` line in `output`
pub fn parse_marker(output: &str, marker: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix(marker))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .last()
        .map(str::to_string)
}
