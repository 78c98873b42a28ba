//! Export completion events
//!
//! The static export tool reports completion with a single loosely typed
//! value: a status word, an empty string, or the path of the generated
//! archive. [`CompletionEvent::from_raw`] turns that into one typed shape so
//! nothing downstream has to guess.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome reported by the export tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Success,
    Failure,
    Unknown,
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportStatus::Success => write!(f, "success"),
            ExportStatus::Failure => write!(f, "failure"),
            ExportStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalized completion callback payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub status: ExportStatus,
    pub archive_hint: Option<String>,
}

const FAILURE_WORDS: &[&str] = &["error", "failed", "failure", "cancelled", "canceled"];

impl CompletionEvent {
    pub fn success() -> Self {
        Self {
            status: ExportStatus::Success,
            archive_hint: None,
        }
    }

    /// Normalize whatever the export tool passed to its completion hook
    pub fn from_raw(raw: &str) -> Self {
        let value = raw.trim();
        let lowered = value.to_ascii_lowercase();

        if value.is_empty() || lowered == "success" {
            return Self::success();
        }

        if FAILURE_WORDS.contains(&lowered.as_str()) {
            return Self {
                status: ExportStatus::Failure,
                archive_hint: None,
            };
        }

        if looks_like_path(value) {
            return Self {
                status: ExportStatus::Success,
                archive_hint: Some(value.to_string()),
            };
        }

        Self {
            status: ExportStatus::Unknown,
            archive_hint: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExportStatus::Success
    }
}

fn looks_like_path(value: &str) -> bool {
    value.contains('/') || value.contains('\\') || Path::new(value).exists()
}
