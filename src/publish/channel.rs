//! Where published boards live
//!
//! The chat platform is an external collaborator; the publisher only needs to
//! send a new artifact, edit an existing one, and (for fallback discovery) list
//! recent ones. [`FileChannel`] is the bundled implementation: each destination
//! is a directory and each artifact a text file inside it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Handle to one published artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub destination: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct RecentArtifact {
    pub artifact: ArtifactRef,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("destination '{destination}' is unavailable")]
    DestinationUnavailable { destination: String },

    #[error("artifact {id} not found in '{destination}'")]
    NotFound { destination: String, id: String },

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ArtifactChannel: Send + Sync {
    async fn send(&self, destination: &str, content: &str) -> Result<ArtifactRef, ChannelError>;

    async fn edit(&self, artifact: &ArtifactRef, content: &str) -> Result<(), ChannelError>;

    /// Most recent artifacts first. Only used to rediscover a board whose
    /// registry entry was lost.
    async fn list_recent(
        &self,
        _destination: &str,
        _limit: usize,
    ) -> Result<Vec<RecentArtifact>, ChannelError> {
        Ok(Vec::new())
    }
}

/// Artifacts as files under `<root>/<destination>/<id>.txt`.
///
/// A destination whose directory does not exist is unavailable; the channel
/// never creates destinations on its own.
#[derive(Debug, Clone)]
pub struct FileChannel {
    root: PathBuf,
}

impl FileChannel {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn destination_dir(&self, destination: &str) -> Result<PathBuf, ChannelError> {
        let unavailable = || ChannelError::DestinationUnavailable {
            destination: destination.to_string(),
        };
        if destination.is_empty() || destination.contains(['/', '\\']) || destination.starts_with('.') {
            return Err(unavailable());
        }
        let dir = self.root.join(destination);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(unavailable()),
        }
    }

    fn artifact_path(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.txt", id))
    }
}

#[async_trait]
impl ArtifactChannel for FileChannel {
    async fn send(&self, destination: &str, content: &str) -> Result<ArtifactRef, ChannelError> {
        let dir = self.destination_dir(destination).await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        tokio::fs::write(Self::artifact_path(&dir, &id), content).await?;
        debug!(destination, id = %id, "Artifact created");
        Ok(ArtifactRef {
            destination: destination.to_string(),
            id,
        })
    }

    async fn edit(&self, artifact: &ArtifactRef, content: &str) -> Result<(), ChannelError> {
        let dir = self.destination_dir(&artifact.destination).await?;
        let path = Self::artifact_path(&dir, &artifact.id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(ChannelError::NotFound {
                destination: artifact.destination.clone(),
                id: artifact.id.clone(),
            });
        }
        tokio::fs::write(&path, content).await?;
        debug!(destination = %artifact.destination, id = %artifact.id, "Artifact edited");
        Ok(())
    }

    async fn list_recent(
        &self,
        destination: &str,
        limit: usize,
    ) -> Result<Vec<RecentArtifact>, ChannelError> {
        let dir = self.destination_dir(destination).await?;
        let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            found.push((modified, path));
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));

        let mut recent = Vec::new();
        for (_, path) in found.into_iter().take(limit) {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let content = tokio::fs::read_to_string(&path).await?;
            recent.push(RecentArtifact {
                artifact: ArtifactRef {
                    destination: destination.to_string(),
                    id,
                },
                content,
            });
        }
        Ok(recent)
    }
}
