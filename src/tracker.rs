//! Typed command surface over the ledger and the published boards
//!
//! Front ends (the CLI, a chat bot) hand in pre-validated arguments; the
//! tracker resolves labels, applies the mutation, writes an audit event and
//! schedules a board refresh.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::bulk::{self, BulkLineError, BulkReport, LineFailure, ParticipantLine};
use crate::error::{LedgerError, Result};
use crate::identity::{placeholder_label, IdentityResolver};
use crate::ledger::{
    LedgerStore, MatchRecord, NewMatch, NewParticipant, Outcome, ParticipantEntry, ParticipantId,
    Snapshot, Window,
};
use crate::publish::{BoardKind, PublishOutcome, Publisher};
use crate::ranking::{self, Leaderboard, Metric, PersonalStats, RankOptions};
use crate::view::HistoryView;

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Reject participants the resolver does not know
    pub require_known: bool,
    /// Match header keyword for imports (`Family` unless configured)
    pub header_keyword: String,
    /// Spawn a background board refresh after each mutation
    pub auto_refresh: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            require_known: false,
            header_keyword: bulk::DEFAULT_HEADER_KEYWORD.to_string(),
            auto_refresh: true,
        }
    }
}

pub struct Tracker {
    store: Arc<LedgerStore>,
    publisher: Arc<Publisher>,
    resolver: Arc<dyn IdentityResolver>,
    settings: TrackerSettings,
}

impl Tracker {
    pub fn new(
        store: Arc<LedgerStore>,
        publisher: Arc<Publisher>,
        resolver: Arc<dyn IdentityResolver>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            store,
            publisher,
            resolver,
            settings,
        }
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.store.snapshot().await
    }

    /// Record a new match; returns its ordinal (always 1).
    pub async fn add_match(&self, new: NewMatch) -> Result<usize> {
        let timestamp = new.timestamp.unwrap_or_else(Utc::now);
        let record = MatchRecord::new(new.opponent.clone(), timestamp, new.outcome);
        let ordinal = self.store.append(record).await?;

        info!(
            target: "audit",
            action = "add_match",
            opponent = %new.opponent,
            outcome = ?new.outcome,
            %timestamp,
            "Match added"
        );
        self.refresh(&[BoardKind::History]);
        Ok(ordinal)
    }

    pub async fn add_participant(&self, new: NewParticipant) -> Result<ParticipantEntry> {
        let label = match self.resolve(new.id).await {
            Some(label) => label,
            None if self.settings.require_known => {
                return Err(LedgerError::ParticipantNotFound { id: new.id })
            }
            None => self.placeholder(new.id),
        };
        let entry = ParticipantEntry {
            id: new.id,
            label,
            damage: new.damage,
            kills: new.kills,
        };
        self.store.add_participant(new.ordinal, entry.clone()).await?;

        info!(
            target: "audit",
            action = "add_participant",
            ordinal = new.ordinal,
            id = entry.id,
            label = %entry.label,
            damage = entry.damage,
            kills = entry.kills,
            "Participant added"
        );
        self.refresh(&BoardKind::ALL);
        Ok(entry)
    }

    /// Append many participants to match `ordinal` in one mutation.
    ///
    /// Fails as a whole only when the match does not exist.
    pub async fn upload_participants(&self, ordinal: usize, text: &str) -> Result<BulkReport> {
        self.store.snapshot().await.index_of(ordinal)?;

        let (parsed, mut failures) = bulk::parse_participants(text);
        let mut entries: Vec<(ParticipantLine, ParticipantEntry)> = Vec::with_capacity(parsed.len());
        for line in parsed {
            let label = match self.resolve(line.id).await {
                Some(label) => label,
                None if self.settings.require_known => {
                    failures.push(line.fail(BulkLineError::UnknownParticipant(line.id)));
                    continue;
                }
                None => self.placeholder(line.id),
            };
            let entry = ParticipantEntry {
                id: line.id,
                label,
                damage: line.damage,
                kills: line.kills,
            };
            entries.push((line, entry));
        }

        let mut report = if entries.is_empty() {
            BulkReport::default()
        } else {
            self.store
                .mutate(|state| {
                    let mut report = BulkReport::default();
                    for (line, entry) in entries {
                        match state.add_participant(ordinal, entry) {
                            Ok(()) => report.added += 1,
                            Err(LedgerError::DuplicateParticipant { id, .. }) => report
                                .failures
                                .push(line.fail(BulkLineError::DuplicateInMatch(id))),
                            Err(e @ LedgerError::TotalsOverflow { .. }) => {
                                report.failures.push(line.fail(BulkLineError::Rejected(e.to_string())))
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Ok(report)
                })
                .await?
        };
        report.failures.extend(failures);
        report.failures.sort_by_key(|f| f.line);

        info!(
            target: "audit",
            action = "upload_participants",
            ordinal,
            added = report.added,
            failed = report.failures.len(),
            "Participants uploaded"
        );
        if report.added > 0 {
            self.refresh(&BoardKind::ALL);
        }
        Ok(report)
    }

    /// Import matches in bulk; the last match in `text` becomes ordinal 1.
    pub async fn import_matches(&self, text: &str, default_outcome: Outcome) -> Result<BulkReport> {
        let (matches, mut failures) =
            bulk::parse_import(text, &self.settings.header_keyword, default_outcome);

        let now = Utc::now();
        let mut records = Vec::with_capacity(matches.len());
        for imported in matches {
            let mut record = MatchRecord::new(
                imported.opponent,
                imported.timestamp.unwrap_or(now),
                imported.outcome,
            );
            for line in imported.participants {
                let label = match self.resolve(line.id).await {
                    Some(label) => label,
                    None => self.placeholder(line.id),
                };
                record.participants.push(ParticipantEntry {
                    id: line.id,
                    label,
                    damage: line.damage,
                    kills: line.kills,
                });
            }
            records.push((imported.line, imported.header, record));
        }

        let mut report = if records.is_empty() {
            BulkReport::default()
        } else {
            self.store
                .mutate(|state| {
                    let mut report = BulkReport::default();
                    for (line, raw, record) in records {
                        match state.append(record) {
                            Ok(_) => report.added += 1,
                            Err(e @ LedgerError::TotalsOverflow { .. }) => {
                                report.failures.push(LineFailure {
                                    line,
                                    raw,
                                    error: BulkLineError::Rejected(e.to_string()),
                                })
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Ok(report)
                })
                .await?
        };
        report.failures.append(&mut failures);
        report.failures.sort_by_key(|f| f.line);
        let added = report.added;

        info!(
            target: "audit",
            action = "import_matches",
            added = report.added,
            failed = report.failures.len(),
            "Matches imported"
        );
        if added > 0 {
            self.refresh(&BoardKind::ALL);
        }
        Ok(report)
    }

    pub async fn remove_match(&self, ordinal: usize) -> Result<MatchRecord> {
        let removed = self.store.remove_at(ordinal).await?;

        info!(
            target: "audit",
            action = "remove_match",
            ordinal,
            opponent = %removed.opponent,
            participants = removed.participants.len(),
            "Match removed"
        );
        self.refresh(&BoardKind::ALL);
        Ok(removed)
    }

    /// Clear the ledger; returns (matches removed, aggregate entries removed).
    pub async fn reset(&self) -> Result<(usize, usize)> {
        let (matches, entries) = self.store.reset().await?;

        info!(target: "audit", action = "reset", matches, entries, "Ledger reset");
        self.refresh(&BoardKind::ALL);
        Ok((matches, entries))
    }

    pub async fn history_view(&self, window: Window) -> HistoryView {
        let snapshot = self.store.snapshot().await;
        HistoryView::new(window, self.publisher.settings().page_size, &snapshot, Utc::now())
    }

    pub async fn leaderboard(&self, metric: Metric, window: Window) -> Leaderboard {
        let settings = self.publisher.settings();
        let mut options = RankOptions::new(metric).with_limit(settings.top_n);
        if metric == Metric::AverageDamage {
            options = options.with_min_games(settings.min_games_average);
        }
        let snapshot = self.store.snapshot().await;
        ranking::leaderboard(&snapshot, window, options, Utc::now())
    }

    pub async fn personal_stats(&self, id: ParticipantId, window: Window) -> Result<PersonalStats> {
        let snapshot = self.store.snapshot().await;
        let min_games = self.publisher.settings().min_games_average;
        ranking::personal_stats(&snapshot, id, window, min_games, Utc::now())
            .ok_or(LedgerError::ParticipantNotFound { id })
    }

    pub async fn refresh_all(&self) -> Vec<(BoardKind, PublishOutcome)> {
        self.publisher.refresh_all().await
    }

    /// Display label: newest ledger label, else the placeholder.
    pub async fn label(&self, id: ParticipantId) -> String {
        let snapshot = self.store.snapshot().await;
        snapshot
            .latest_label(id)
            .map(str::to_string)
            .unwrap_or_else(|| self.placeholder(id))
    }

    async fn resolve(&self, id: ParticipantId) -> Option<String> {
        match self.resolver.resolve(id).await {
            Ok(label) => Some(label),
            Err(e) => {
                debug!(id, error = %e, "Label lookup failed");
                None
            }
        }
    }

    fn placeholder(&self, id: ParticipantId) -> String {
        placeholder_label(&self.publisher.settings().placeholder_label, id)
    }

    fn refresh(&self, boards: &[BoardKind]) {
        if self.settings.auto_refresh {
            self.publisher.spawn_refresh(boards);
        }
    }
}
