//! Per-request artifacts on local storage.
//!
//! Every request gets a fresh UUID, so concurrent requests never share a file name
//! and no lock is needed. [`ArtifactSet`] owns the request's files and removes them
//! when dropped unless the retention policy keeps them. Unwinding drops it too.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RetentionPolicy;

/// Every extension pdflatex may leave behind for one job.
const ARTIFACT_EXTENSIONS: &[&str] = &["tex", "pdf", "log", "aux", "out"];

const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// 32 lowercase hex characters, unique per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    retention: RetentionPolicy,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, retention: RetentionPolicy) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the outputs directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Allocates a fresh artifact set for one request.
    pub fn allocate(&self) -> ArtifactSet {
        ArtifactSet {
            id: ArtifactId::new(),
            dir: self.dir.clone(),
            cleanup: self.retention == RetentionPolicy::DeleteImmediately,
        }
    }

    /// Starts the background sweep when artifacts are retained. Returns `None` otherwise.
    pub fn spawn_retention_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let RetentionPolicy::RetainFor(max_age) = self.retention else {
            return None;
        };
        let dir = self.dir.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                match sweep_expired(&dir, max_age).await {
                    Ok(0) => {}
                    Ok(removed) => info!("Artifact sweep removed {removed} expired files"),
                    Err(e) => warn!("Artifact sweep of {} failed: {e}", dir.display()),
                }
            }
        }))
    }
}

/// The files belonging to one request.
#[derive(Debug)]
pub struct ArtifactSet {
    id: ArtifactId,
    dir: PathBuf,
    cleanup: bool,
}

impl ArtifactSet {
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.id))
    }

    pub fn tex_path(&self) -> PathBuf {
        self.path("tex")
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.path("pdf")
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        for extension in ARTIFACT_EXTENSIONS {
            let path = self.path(extension);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed artifact {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove artifact {}: {e}", path.display()),
            }
        }
    }
}

/// Removes regular files in `dir` last modified more than `max_age` ago.
pub async fn sweep_expired(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age >= max_age {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
    }

    Ok(removed)
}
