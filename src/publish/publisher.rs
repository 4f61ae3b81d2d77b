//! Idempotent create-or-update of published boards
//!
//! Each board key has its own async lock, so refreshes of the same board run
//! one at a time while different boards proceed in parallel. Inside the lock
//! the board is rendered from the newest snapshot and written to the artifact
//! recorded in the registry; only when no artifact is known is a new one sent.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::channel::{ArtifactChannel, ArtifactRef, ChannelError};
use super::registry::{ArtifactRegistry, BoardKey, BoardKind};
use super::render;
use crate::identity::placeholder_label;
use crate::ledger::{LedgerStore, Window};
use crate::ranking::{self, Metric, RankOptions, DEFAULT_MIN_GAMES_AVERAGE, TOP_N};
use crate::view::{HistoryView, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct BoardSettings {
    pub average_destination: Option<String>,
    pub kills_destination: Option<String>,
    pub history_destination: Option<String>,
    pub min_games_average: u64,
    pub top_n: usize,
    pub page_size: usize,
    /// Look through recent artifacts when the registry has no entry
    pub fallback_discovery: bool,
    pub discovery_limit: usize,
    pub placeholder_label: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            average_destination: None,
            kills_destination: None,
            history_destination: None,
            min_games_average: DEFAULT_MIN_GAMES_AVERAGE,
            top_n: TOP_N,
            page_size: DEFAULT_PAGE_SIZE,
            fallback_discovery: true,
            discovery_limit: 50,
            placeholder_label: "Player {id}".to_string(),
        }
    }
}

impl BoardSettings {
    pub fn destination(&self, board: BoardKind) -> Option<&str> {
        match board {
            BoardKind::AverageDamage => self.average_destination.as_deref(),
            BoardKind::Kills => self.kills_destination.as_deref(),
            BoardKind::History => self.history_destination.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created(ArtifactRef),
    Updated(ArtifactRef),
    /// Nothing to do: no destination configured, or the destination is gone
    Skipped(String),
    /// Logged and dropped; the next refresh tries again
    Failed(String),
}

pub struct Publisher {
    store: Arc<LedgerStore>,
    channel: Arc<dyn ArtifactChannel>,
    registry: ArtifactRegistry,
    settings: BoardSettings,
    locks: DashMap<BoardKey, Arc<Mutex<()>>>,
}

impl Publisher {
    pub fn new(
        store: Arc<LedgerStore>,
        channel: Arc<dyn ArtifactChannel>,
        registry: ArtifactRegistry,
        settings: BoardSettings,
    ) -> Self {
        Self {
            store,
            channel,
            registry,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Refresh every board in order: average damage, kills, history.
    pub async fn refresh_all(&self) -> Vec<(BoardKind, PublishOutcome)> {
        let mut outcomes = Vec::with_capacity(BoardKind::ALL.len());
        for board in BoardKind::ALL {
            outcomes.push((board, self.publish(board).await));
        }
        outcomes
    }

    /// Fire-and-forget refresh of `boards`; failures are only logged.
    pub fn spawn_refresh(self: &Arc<Self>, boards: &[BoardKind]) {
        for &board in boards {
            let publisher = Arc::clone(self);
            tokio::spawn(async move {
                publisher.publish(board).await;
            });
        }
    }

    /// Publish `board` to its configured destination.
    pub async fn publish(&self, board: BoardKind) -> PublishOutcome {
        match self.settings.destination(board) {
            Some(destination) => self.publish_to(&BoardKey::new(board, destination)).await,
            None => {
                debug!(%board, "No destination configured, skipping");
                PublishOutcome::Skipped(format!("no destination configured for {}", board))
            }
        }
    }

    pub async fn publish_to(&self, key: &BoardKey) -> PublishOutcome {
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let _guard = lock.lock().await;

        let content = self.render(key.board).await;
        let outcome = self.sync(key, &content).await;
        match &outcome {
            PublishOutcome::Created(artifact) => {
                info!(board = %key, id = %artifact.id, "Board published")
            }
            PublishOutcome::Updated(artifact) => {
                debug!(board = %key, id = %artifact.id, "Board updated")
            }
            PublishOutcome::Skipped(reason) => debug!(board = %key, reason = %reason, "Board skipped"),
            PublishOutcome::Failed(error) => warn!(board = %key, error = %error, "Board publish failed"),
        }
        outcome
    }

    /// Board text from the newest snapshot.
    pub async fn render(&self, board: BoardKind) -> String {
        let snapshot = self.store.snapshot().await;
        let now = Utc::now();

        let metric = match board {
            BoardKind::AverageDamage => Metric::AverageDamage,
            BoardKind::Kills => Metric::TotalKills,
            BoardKind::History => {
                let view = HistoryView::new(Window::All, self.settings.page_size, &snapshot, now);
                return render::history(&view.render(), &Window::All.describe(), now);
            }
        };

        let mut options = RankOptions::new(metric).with_limit(self.settings.top_n);
        if metric == Metric::AverageDamage {
            options = options.with_min_games(self.settings.min_games_average);
        }
        let ranked = ranking::leaderboard(&snapshot, Window::All, options, now);
        let label = |id| {
            snapshot
                .latest_label(id)
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_label(&self.settings.placeholder_label, id))
        };
        render::leaderboard(&ranked, label, now)
    }

    async fn sync(&self, key: &BoardKey, content: &str) -> PublishOutcome {
        let known = match self.registry.get(key) {
            Some(artifact) => Some(artifact),
            None => self.discover(key).await,
        };

        if let Some(artifact) = known {
            match self.channel.edit(&artifact, content).await {
                Ok(()) => return PublishOutcome::Updated(artifact),
                Err(ChannelError::NotFound { .. }) => {
                    info!(board = %key, id = %artifact.id, "Artifact vanished, publishing a new one");
                    if let Err(e) = self.registry.remove(key) {
                        warn!(board = %key, error = %e, "Failed to drop stale registry entry");
                    }
                }
                Err(ChannelError::DestinationUnavailable { destination }) => {
                    return PublishOutcome::Skipped(format!("destination '{}' unavailable", destination));
                }
                // Sending here could leave two live artifacts for one board.
                Err(e) => return PublishOutcome::Failed(e.to_string()),
            }
        }

        match self.channel.send(&key.destination, content).await {
            Ok(artifact) => {
                if let Err(e) = self.registry.set(key.clone(), artifact.clone()) {
                    warn!(board = %key, error = %e, "Failed to persist artifact mapping");
                }
                PublishOutcome::Created(artifact)
            }
            Err(ChannelError::DestinationUnavailable { destination }) => {
                PublishOutcome::Skipped(format!("destination '{}' unavailable", destination))
            }
            Err(e) => PublishOutcome::Failed(e.to_string()),
        }
    }

    /// Recover a lost registry entry by title; never the primary lookup.
    async fn discover(&self, key: &BoardKey) -> Option<ArtifactRef> {
        if !self.settings.fallback_discovery {
            return None;
        }
        let marker = render::title(key.board, self.settings.top_n);
        let recent = match self
            .channel
            .list_recent(&key.destination, self.settings.discovery_limit)
            .await
        {
            Ok(recent) => recent,
            Err(e) => {
                debug!(board = %key, error = %e, "Fallback discovery unavailable");
                return None;
            }
        };

        let found = recent
            .into_iter()
            .find(|r| r.content.lines().next() == Some(marker.as_str()))
            .map(|r| r.artifact)?;

        info!(board = %key, id = %found.id, "Recovered artifact by title");
        if let Err(e) = self.registry.set(key.clone(), found.clone()) {
            warn!(board = %key, error = %e, "Failed to persist recovered mapping");
        }
        Some(found)
    }
}
