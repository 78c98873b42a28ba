//! Cloudflare publisher error types

use pagesflow_core::PublishError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<CloudflareError> for PublishError {
    fn from(err: CloudflareError) -> Self {
        match err {
            CloudflareError::Publish(e) => e,
            CloudflareError::IoError(e) => PublishError::Io(e),
            CloudflareError::JsonError(e) => PublishError::Json(e),
            CloudflareError::Http(e) => PublishError::Transport(e.to_string()),
            CloudflareError::InvalidResponse(message) => PublishError::Transport(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudflareError>;
