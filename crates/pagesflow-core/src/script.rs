//! External script preconditions
//!
//! Shared by the delegated deploy publisher and the trigger notifier.

use crate::error::{PublishError, Result};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;

/// Check that `path` names an existing, executable regular file
pub async fn check_script(path: &Path) -> Result<()> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PublishError::ScriptMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(PublishError::ScriptMissing(path.to_path_buf()));
    }

    if !is_executable(&metadata) {
        return Err(PublishError::ScriptNotExecutable(path.to_path_buf()));
    }

    Ok(())
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    true
}
