//! Persisted board identity → artifact mapping
//!
//! This is what keeps publication idempotent: a board is found by its key,
//! never by scanning recent artifacts for a matching title.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::channel::ArtifactRef;
use crate::error::StorageError;
use crate::persist::JsonFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    AverageDamage,
    Kills,
    History,
}

impl BoardKind {
    /// Refresh order used by the scheduler
    pub const ALL: [BoardKind; 3] = [BoardKind::AverageDamage, BoardKind::Kills, BoardKind::History];
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoardKind::AverageDamage => "average_damage",
            BoardKind::Kills => "kills",
            BoardKind::History => "history",
        })
    }
}

/// Identity of one live board
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardKey {
    pub board: BoardKind,
    pub destination: String,
}

impl BoardKey {
    pub fn new(board: BoardKind, destination: impl Into<String>) -> Self {
        Self {
            board,
            destination: destination.into(),
        }
    }
}

impl fmt::Display for BoardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.board, self.destination)
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryEntry {
    #[serde(flatten)]
    key: BoardKey,
    artifact: ArtifactRef,
}

pub struct ArtifactRegistry {
    file: JsonFile,
    entries: Mutex<HashMap<BoardKey, ArtifactRef>>,
}

impl ArtifactRegistry {
    pub fn open(path: &Path) -> Self {
        let file = JsonFile::new(path);
        let stored: Vec<RegistryEntry> = file.load_or_default();
        let entries = stored.into_iter().map(|e| (e.key, e.artifact)).collect();
        Self {
            file,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, key: &BoardKey) -> Option<ArtifactRef> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: BoardKey, artifact: ArtifactRef) -> Result<(), StorageError> {
        let mut entries = self.lock();
        debug!(board = %key, id = %artifact.id, "Registering artifact");
        entries.insert(key, artifact);
        self.save(&entries)
    }

    pub fn remove(&self, key: &BoardKey) -> Result<Option<ArtifactRef>, StorageError> {
        let mut entries = self.lock();
        let removed = entries.remove(key);
        if removed.is_some() {
            self.save(&entries)?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BoardKey, ArtifactRef>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, entries: &HashMap<BoardKey, ArtifactRef>) -> Result<(), StorageError> {
        let mut stored: Vec<RegistryEntry> = entries
            .iter()
            .map(|(key, artifact)| RegistryEntry {
                key: key.clone(),
                artifact: artifact.clone(),
            })
            .collect();
        stored.sort_by(|a, b| a.key.to_string().cmp(&b.key.to_string()));
        self.file.save(&stored)
    }
}
