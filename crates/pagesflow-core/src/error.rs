//! Publish error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors terminating a single publish attempt
///
/// None of these are retried internally. Callers surface them and re-run
/// the whole flow if they want another attempt.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("No files to upload in {0}")]
    NoFiles(PathBuf),

    #[error("Cloudflare API error ({operation}): {message} (HTTP {status})")]
    Remote {
        operation: &'static str,
        message: String,
        status: u16,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Deployment references content with no local file: {}", .0.join(", "))]
    MissingLocalContent(Vec<String>),

    #[error("Deploy script exited with {}: {output}", exit_code_label(.code))]
    Subprocess { code: Option<i32>, output: String },

    #[error("Deploy script succeeded but printed no DEPLOYMENT_URL line")]
    MissingOutput { output: String },

    #[error("Deploy script not found: {0}")]
    ScriptMissing(PathBuf),

    #[error("Deploy script is not executable: {0}")]
    ScriptNotExecutable(PathBuf),

    #[error("A publish is already running for project {project} (held by {holder})")]
    InProgress { project: String, holder: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<pagesflow_config::ConfigError> for PublishError {
    fn from(err: pagesflow_config::ConfigError) -> Self {
        PublishError::ConfigurationMissing(err.to_string())
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
