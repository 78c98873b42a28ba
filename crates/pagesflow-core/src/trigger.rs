//! Trigger file notifier
//!
//! Instead of publishing, this hands the finished export over to something
//! outside the process: a host-side watcher polling the trigger file, and
//! optionally a script started in the background. Nothing here waits for
//! the publish itself.

use crate::error::Result;
use crate::script::check_script;
use chrono::{SecondsFormat, Utc};
use pagesflow_config::DeployConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::process::Command;

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Contents of the trigger file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub generated_at_utc: String,
    pub static_dir: String,
    pub archive_dir: String,
}

impl TriggerRecord {
    pub fn now(static_dir: &Path, archive_dir: Option<&str>) -> Self {
        Self {
            generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            static_dir: static_dir.display().to_string(),
            archive_dir: archive_dir.unwrap_or_default().to_string(),
        }
    }
}

/// What happened to the optional background script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLaunch {
    NotConfigured,
    Started,
    Skipped(String),
}

/// Result of one notification
#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    pub record: TriggerRecord,
    pub script: ScriptLaunch,
}

pub struct TriggerNotifier {
    trigger_path: PathBuf,
    script_path: Option<PathBuf>,
}

impl TriggerNotifier {
    pub fn new(trigger_path: impl Into<PathBuf>, script_path: Option<PathBuf>) -> Self {
        Self {
            trigger_path: trigger_path.into(),
            script_path,
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(&config.trigger_file_path, config.script_path.clone())
    }

    pub fn trigger_path(&self) -> &Path {
        &self.trigger_path
    }

    /// Write the trigger record, then start the script if one is usable
    ///
    /// Only the trigger write can fail; script problems are logged.
    pub async fn notify(&self, static_dir: &Path, archive_dir: Option<&str>) -> Result<NotifyOutcome> {
        let record = TriggerRecord::now(static_dir, archive_dir);
        self.write_record(&record).await?;
        tracing::info!("Wrote deploy trigger: {}", self.trigger_path.display());

        let script = self.launch_script().await;
        Ok(NotifyOutcome { record, script })
    }

    /// Replace the trigger file wholesale
    async fn write_record(&self, record: &TriggerRecord) -> Result<()> {
        if let Some(parent) = self.trigger_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // written aside and renamed into place; the tmp name is unique per writer
        let tmp_path = self.trigger_path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.trigger_path).await?;
        Ok(())
    }

    async fn launch_script(&self) -> ScriptLaunch {
        let Some(script) = &self.script_path else {
            return ScriptLaunch::NotConfigured;
        };

        if let Err(e) = check_script(script).await {
            tracing::warn!("Skipping deploy script: {}", e);
            return ScriptLaunch::Skipped(e.to_string());
        }

        let spawned = Command::new(script)
            .arg(&self.trigger_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                tracing::info!(
                    "Started deploy script {} (pid {:?})",
                    script.display(),
                    child.id()
                );
                ScriptLaunch::Started
            }
            Err(e) => {
                tracing::warn!("Failed to start deploy script {}: {}", script.display(), e);
                ScriptLaunch::Skipped(e.to_string())
            }
        }
    }
}
