//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use capt_ledger::identity::{IdentityResolver, ResolveError, RosterResolver};
use capt_ledger::ledger::{LedgerStore, ParticipantId};
use capt_ledger::publish::{
    ArtifactChannel, ArtifactRef, ArtifactRegistry, BoardSettings, ChannelError, Publisher,
    RecentArtifact,
};
use capt_ledger::tracker::{Tracker, TrackerSettings};

/// In-memory channel that counts calls and can slow them down.
#[derive(Default)]
pub struct MemoryChannel {
    artifacts: Mutex<HashMap<ArtifactRef, String>>,
    next_id: AtomicUsize,
    pub sends: AtomicUsize,
    pub edits: AtomicUsize,
    delay: Duration,
}

impl MemoryChannel {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn artifacts(&self) -> Vec<(ArtifactRef, String)> {
        let artifacts = self.artifacts.lock().unwrap();
        artifacts.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn count(&self, destination: &str) -> usize {
        self.artifacts
            .lock()
            .unwrap()
            .keys()
            .filter(|a| a.destination == destination)
            .count()
    }

    pub fn content(&self, artifact: &ArtifactRef) -> Option<String> {
        self.artifacts.lock().unwrap().get(artifact).cloned()
    }

    pub fn delete(&self, artifact: &ArtifactRef) {
        self.artifacts.lock().unwrap().remove(artifact);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ArtifactChannel for MemoryChannel {
    async fn send(&self, destination: &str, content: &str) -> Result<ArtifactRef, ChannelError> {
        self.pause().await;
        if destination == "gone" {
            return Err(ChannelError::DestinationUnavailable {
                destination: destination.to_string(),
            });
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        let artifact = ArtifactRef {
            destination: destination.to_string(),
            id: format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.artifacts
            .lock()
            .unwrap()
            .insert(artifact.clone(), content.to_string());
        Ok(artifact)
    }

    async fn edit(&self, artifact: &ArtifactRef, content: &str) -> Result<(), ChannelError> {
        self.pause().await;
        self.edits.fetch_add(1, Ordering::SeqCst);
        match self.artifacts.lock().unwrap().get_mut(artifact) {
            Some(body) => {
                *body = content.to_string();
                Ok(())
            }
            None => Err(ChannelError::NotFound {
                destination: artifact.destination.clone(),
                id: artifact.id.clone(),
            }),
        }
    }

    async fn list_recent(
        &self,
        destination: &str,
        _limit: usize,
    ) -> Result<Vec<RecentArtifact>, ChannelError> {
        Ok(self
            .artifacts()
            .into_iter()
            .filter(|(a, _)| a.destination == destination)
            .map(|(artifact, content)| RecentArtifact { artifact, content })
            .collect())
    }
}

/// Resolver that is always down.
pub struct OfflineResolver;

#[async_trait]
impl IdentityResolver for OfflineResolver {
    async fn resolve(&self, _id: ParticipantId) -> Result<String, ResolveError> {
        Err(ResolveError::Unavailable("offline".into()))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<LedgerStore>,
    pub channel: Arc<MemoryChannel>,
    pub publisher: Arc<Publisher>,
    pub tracker: Arc<Tracker>,
}

pub fn board_settings() -> BoardSettings {
    BoardSettings {
        average_destination: Some("avg".into()),
        kills_destination: Some("kills".into()),
        history_destination: Some("history".into()),
        min_games_average: 1,
        fallback_discovery: false,
        ..BoardSettings::default()
    }
}

pub fn harness(channel: MemoryChannel, settings: BoardSettings) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(LedgerStore::open(
        &dir.path().join("capts.json"),
        &dir.path().join("stats.json"),
    ));
    let channel = Arc::new(channel);
    let publisher = Arc::new(Publisher::new(
        store.clone(),
        channel.clone(),
        ArtifactRegistry::open(&dir.path().join("artifacts.json")),
        settings,
    ));
    let roster = RosterResolver::new(HashMap::from([(1, "Nika".to_string()), (2, "Lev".to_string())]));
    let tracker = Arc::new(Tracker::new(
        store.clone(),
        publisher.clone(),
        Arc::new(roster),
        TrackerSettings {
            auto_refresh: false,
            ..TrackerSettings::default()
        },
    ));
    Harness {
        dir,
        store,
        channel,
        publisher,
        tracker,
    }
}
