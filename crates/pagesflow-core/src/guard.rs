//! Single-flight publish guard
//!
//! The export tool can fire its completion hook more than once, and each
//! invocation is a separate process. A lock file per project under the lock
//! directory makes sure only one of them talks to the deployment API at a
//! time.

use crate::error::{PublishError, Result};
use crate::publisher::{PublishOutcome, Publisher};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const LOCK_PREFIX: &str = "pagesflow-";
const LOCK_SUFFIX: &str = ".lock";
const STALE_AFTER_HOURS: i64 = 1;

static CLAIM_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    fn is_stale(&self) -> bool {
        Utc::now().signed_duration_since(self.acquired_at) >= Duration::hours(STALE_AFTER_HOURS)
    }

    fn describe(&self) -> String {
        format!("{} pid {} since {}", self.holder, self.pid, self.acquired_at)
    }
}

/// RAII guard for a per-project publish lock
#[derive(Debug)]
pub struct PublishGuard {
    lock_path: PathBuf,
    released: bool,
}

impl PublishGuard {
    /// Path of the lock file for `project`
    ///
    /// Bytes outside `[A-Za-z0-9-]` are written as `_xx` (hex), so distinct
    /// project names never share a lock.
    pub fn lock_path(lock_dir: &Path, project: &str) -> PathBuf {
        let mut safe = String::with_capacity(project.len());
        for byte in project.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                safe.push(byte as char);
            } else {
                safe.push_str(&format!("_{:02x}", byte));
            }
        }
        lock_dir.join(format!("{}{}{}", LOCK_PREFIX, safe, LOCK_SUFFIX))
    }

    /// Acquire the lock for `project`, replacing it if it is stale
    pub async fn acquire(lock_dir: &Path, project: &str) -> Result<Self> {
        fs::create_dir_all(lock_dir).await?;

        let lock_path = Self::lock_path(lock_dir, project);
        let content = serde_json::to_string_pretty(&LockInfo::current())?;

        match create_lock_file(&lock_path, &content).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let observed = check_existing_lock(&lock_path, project).await?;
                claim_stale_lock(&lock_path, &observed, project).await?;

                create_lock_file(&lock_path, &content)
                    .await
                    .map_err(|e| match e.kind() {
                        ErrorKind::AlreadyExists => in_progress(project, "another process"),
                        _ => PublishError::Io(e),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Acquired publish lock: {}", lock_path.display());
        Ok(Self {
            lock_path,
            released: false,
        })
    }

    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            match fs::remove_file(&self.lock_path).await {
                Ok(()) => tracing::debug!("Released publish lock"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

async fn create_lock_file(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}

fn in_progress(project: &str, holder: impl Into<String>) -> PublishError {
    PublishError::InProgress {
        project: project.to_string(),
        holder: holder.into(),
    }
}

/// Fails with `InProgress` unless the existing lock is stale
///
/// Returns the lock content as it was judged, for [`claim_stale_lock`].
async fn check_existing_lock(lock_path: &Path, project: &str) -> Result<String> {
    let content = fs::read_to_string(lock_path).await.unwrap_or_default();
    let parsed = serde_json::from_str::<LockInfo>(&content).ok();

    match parsed {
        Some(info) if !info.is_stale() => Err(in_progress(project, info.describe())),
        Some(info) => {
            tracing::warn!("Removing stale publish lock from {}", info.describe());
            Ok(content)
        }
        None => {
            // Half-written or foreign file: judge by age alone.
            let age = fs::metadata(lock_path)
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            match age {
                Some(age) if age.as_secs() >= (STALE_AFTER_HOURS * 3600) as u64 => {
                    tracing::warn!("Removing unreadable stale lock: {}", lock_path.display());
                    Ok(content)
                }
                _ => Err(in_progress(project, "unknown")),
            }
        }
    }
}

/// Move the stale lock out of the way and delete it
///
/// Only one process can rename the file. A claimer whose rename picked up
/// something other than the stale content it judged has taken a live lock:
/// it puts the lock back and backs off.
async fn claim_stale_lock(lock_path: &Path, observed: &str, project: &str) -> Result<()> {
    let claimed = lock_path.with_extension(format!(
        "lock.stale.{}.{}",
        std::process::id(),
        CLAIM_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    match fs::rename(lock_path, &claimed).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(in_progress(project, "another process"));
        }
        Err(e) => return Err(e.into()),
    }

    let taken = fs::read_to_string(&claimed).await.unwrap_or_default();
    if taken != observed {
        // hard_link refuses to clobber a lock created in the meantime
        if let Err(e) = fs::hard_link(&claimed, lock_path).await {
            tracing::debug!("Live lock not restored: {}", e);
        }
        let _ = fs::remove_file(&claimed).await;
        return Err(in_progress(project, "another process"));
    }

    match fs::remove_file(&claimed).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Publisher wrapper holding the project lock for the duration of a publish
pub struct GuardedPublisher<P> {
    inner: P,
    lock_dir: PathBuf,
}

impl<P: Publisher> GuardedPublisher<P> {
    pub fn new(inner: P, lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            lock_dir: lock_dir.into(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Publisher> Publisher for GuardedPublisher<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn project(&self) -> &str {
        self.inner.project()
    }

    async fn publish(&self, directory: &Path) -> Result<PublishOutcome> {
        let guard = PublishGuard::acquire(&self.lock_dir, self.inner.project()).await?;
        let result = self.inner.publish(directory).await;

        if let Err(e) = guard.release().await {
            tracing::warn!("Failed to release publish lock: {}", e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct SlowPublisher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Publisher for SlowPublisher {
        fn name(&self) -> &str {
            "slow"
        }

        fn project(&self) -> &str {
            "blog"
        }

        async fn publish(&self, _directory: &Path) -> Result<PublishOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok(PublishOutcome::new("https://blog.pages.dev", None))
        }
    }

    #[tokio::test]
    async fn test_second_acquire_is_refused() {
        let dir = tempdir().unwrap();

        let first = PublishGuard::acquire(dir.path(), "blog").await.unwrap();
        let err = PublishGuard::acquire(dir.path(), "blog").await.unwrap_err();
        assert!(matches!(err, PublishError::InProgress { ref project, .. } if project == "blog"));

        first.release().await.unwrap();
        let again = PublishGuard::acquire(dir.path(), "blog").await.unwrap();
        again.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_projects_are_independent() {
        let dir = tempdir().unwrap();

        let _blog = PublishGuard::acquire(dir.path(), "blog").await.unwrap();
        let _docs = PublishGuard::acquire(dir.path(), "docs").await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_releases_lock() {
        let dir = tempdir().unwrap();
        let path = PublishGuard::lock_path(dir.path(), "blog");

        {
            let _guard = PublishGuard::acquire(dir.path(), "blog").await.unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_replaced() {
        let dir = tempdir().unwrap();
        let path = PublishGuard::lock_path(dir.path(), "blog");

        let stale = LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            acquired_at: Utc::now() - Duration::hours(2),
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let guard = PublishGuard::acquire(dir.path(), "blog").await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(&std::process::id().to_string()));
        guard.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_fresh_unreadable_lock_is_respected() {
        let dir = tempdir().unwrap();
        let path = PublishGuard::lock_path(dir.path(), "blog");
        std::fs::write(&path, "").unwrap();

        let err = PublishGuard::acquire(dir.path(), "blog").await.unwrap_err();
        assert!(matches!(err, PublishError::InProgress { .. }));
    }

    #[test]
    fn test_lock_path_sanitizes_project() {
        let path = PublishGuard::lock_path(Path::new("/tmp"), "../evil project");
        assert_eq!(
            path,
            PathBuf::from("/tmp/pagesflow-_2e_2e_2fevil_20project.lock")
        );
        assert_eq!(
            PublishGuard::lock_path(Path::new("/tmp"), "my-blog"),
            PathBuf::from("/tmp/pagesflow-my-blog.lock")
        );
    }

    #[test]
    fn test_lock_path_keeps_projects_apart() {
        let dir = Path::new("/tmp");
        let names = ["a.b", "a_b", "a b", "a-b", "ab"];
        let paths: std::collections::HashSet<PathBuf> = names
            .iter()
            .map(|name| PublishGuard::lock_path(dir, name))
            .collect();
        assert_eq!(paths.len(), names.len());
    }

    fn stale_lock_content() -> String {
        serde_json::to_string(&LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            acquired_at: Utc::now() - Duration::hours(2),
        })
        .unwrap()
    }

    /// A claimer that judged a stale lock must not remove a lock
    /// that was replaced after its check.
    #[tokio::test]
    async fn test_claim_leaves_replaced_lock_alone() {
        let dir = tempdir().unwrap();
        let path = PublishGuard::lock_path(dir.path(), "blog");
        let observed = stale_lock_content();

        let fresh = serde_json::to_string(&LockInfo::current()).unwrap();
        std::fs::write(&path, &fresh).unwrap();

        let err = claim_stale_lock(&path, &observed, "blog").await.unwrap_err();
        assert!(matches!(err, PublishError::InProgress { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), fresh);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_claim_after_other_claimer_is_refused() {
        let dir = tempdir().unwrap();
        let path = PublishGuard::lock_path(dir.path(), "blog");

        let err = claim_stale_lock(&path, &stale_lock_content(), "blog")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InProgress { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_lock_replaced_by_exactly_one() {
        for _ in 0..20 {
            let dir = tempdir().unwrap();
            let path = PublishGuard::lock_path(dir.path(), "blog");
            std::fs::write(&path, stale_lock_content()).unwrap();

            let (a, b) = tokio::join!(
                PublishGuard::acquire(dir.path(), "blog"),
                PublishGuard::acquire(dir.path(), "blog")
            );

            let held = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
            assert_eq!(held, 1);
        }
    }

    #[tokio::test]
    async fn test_concurrent_publishes_are_single_flight() {
        let dir = tempdir().unwrap();
        let site = tempdir().unwrap();
        let publisher = GuardedPublisher::new(
            SlowPublisher {
                calls: AtomicUsize::new(0),
            },
            dir.path(),
        );

        let (a, b) = tokio::join!(publisher.publish(site.path()), publisher.publish(site.path()));

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(PublishError::InProgress { .. }))));
        assert_eq!(publisher.inner().calls.load(Ordering::SeqCst), 1);

        // lock is gone afterwards
        assert!(publisher.publish(site.path()).await.is_ok());
    }
}
