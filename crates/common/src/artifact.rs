//! Failure artifact storage
//!
//! Artifacts (usually screenshots) are written as opaque blobs named
//! `{logicalName}_{contextId}_{timestamp}.{ext}`. Timestamps come from a
//! process-wide strictly monotonic clock, so two artifacts never share a
//! `(contextId, timestamp)` pair, and files are published with a hard link
//! from a temp file, which fails instead of replacing an existing path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::ContextId;
use crate::{Error, Result};

static LAST_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current UTC time, strictly later than any value previously returned.
pub fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
    let prev = LAST_NANOS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    DateTime::from_timestamp_nanos(now.max(prev.saturating_add(1)))
}

/// A failure byproduct waiting to be persisted
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub context: ContextId,
    pub at: DateTime<Utc>,
    pub extension: String,
    pub data: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, context: ContextId, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            context,
            at: monotonic_now(),
            extension: "png".to_string(),
            data,
        }
    }

    /// `{logicalName}_{contextId}_{timestamp}` without extension.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            sanitize(&self.name),
            self.context,
            self.at.format("%Y%m%dT%H%M%S%.9fZ")
        )
    }
}

/// Record of a persisted artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifact {
    pub name: String,
    pub context: ContextId,
    pub at: DateTime<Utc>,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Durable storage for failure artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Persist `artifact`; the returned path is unique to this call.
    async fn save(&self, artifact: Artifact) -> Result<SavedArtifact>;

    /// Drain the records saved so far for `context`.
    fn take_saved(&self, context: ContextId) -> Vec<SavedArtifact>;
}

/// Filesystem-backed artifact store
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    saved: DashMap<ContextId, Vec<SavedArtifact>>,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(".tmp")).await?;

        info!("Artifact store at {:?}", root);

        Ok(Self {
            root,
            saved: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Link `tmp` to the first free candidate path derived from `stem`.
    async fn publish(&self, tmp: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
        for attempt in 0u32.. {
            let file_name = match (attempt, extension.is_empty()) {
                (0, true) => stem.to_string(),
                (0, false) => format!("{}.{}", stem, extension),
                (n, true) => format!("{}-{}", stem, n),
                (n, false) => format!("{}-{}.{}", stem, n, extension),
            };
            let path = self.root.join(file_name);

            match fs::hard_link(tmp, &path).await {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Artifact path {:?} taken, trying next suffix", path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Artifact(format!("no free path for {}", stem)))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, artifact: Artifact) -> Result<SavedArtifact> {
        let stem = artifact.file_stem();
        let sha256 = Self::hash(&artifact.data);

        let tmp = self.root.join(".tmp").join(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, &artifact.data).await?;
        let published = self.publish(&tmp, &stem, &artifact.extension).await;
        if let Err(e) = fs::remove_file(&tmp).await {
            debug!("Could not remove staging file {:?}: {}", tmp, e);
        }
        let path = published?;

        let saved = SavedArtifact {
            name: artifact.name,
            context: artifact.context,
            at: artifact.at,
            path,
            size: artifact.data.len() as u64,
            sha256,
        };

        debug!(
            context = %saved.context,
            "Stored artifact {:?} ({} bytes)",
            saved.path,
            saved.size
        );

        self.saved
            .entry(saved.context)
            .or_default()
            .push(saved.clone());
        Ok(saved)
    }

    fn take_saved(&self, context: ContextId) -> Vec<SavedArtifact> {
        self.saved
            .remove(&context)
            .map(|(_, list)| list)
            .unwrap_or_default()
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}
