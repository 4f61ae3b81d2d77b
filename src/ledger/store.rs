//! Durable ledger store
//!
//! Holds the ordered match records together with their aggregate index behind a
//! single writer lock. Every mutation works on a copy of the current state, is
//! persisted, and only then becomes visible; readers take cheap `Arc` snapshots
//! and never see a half-applied change.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::aggregate::{AggregateIndex, Sign};
use super::model::{MatchRecord, ParticipantEntry, ParticipantId};
use crate::error::{LedgerError, Result, StorageError};
use crate::persist::JsonFile;

/// Ledger records plus the index derived from them
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    records: Vec<MatchRecord>,
    aggregate: AggregateIndex,
}

/// Immutable view of the ledger at one instant
pub type Snapshot = Arc<LedgerState>;

impl LedgerState {
    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        let aggregate = AggregateIndex::rebuild(&records);
        Self { records, aggregate }
    }

    /// Records in insertion order (oldest first)
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn aggregate(&self) -> &AggregateIndex {
        &self.aggregate
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position in `records()` for a reverse-chronological ordinal (1 = newest).
    pub fn index_of(&self, ordinal: usize) -> Result<usize> {
        if ordinal == 0 || ordinal > self.records.len() {
            return Err(LedgerError::MatchNotFound {
                ordinal,
                len: self.records.len(),
            });
        }
        Ok(self.records.len() - ordinal)
    }

    /// Reverse-chronological ordinal for a position in `records()`.
    pub fn ordinal_of(&self, index: usize) -> usize {
        self.records.len() - index
    }

    pub fn get(&self, ordinal: usize) -> Option<&MatchRecord> {
        self.index_of(ordinal).ok().map(|i| &self.records[i])
    }

    /// Label recorded on the participant's most recent entry
    pub fn latest_label(&self, id: ParticipantId) -> Option<&str> {
        self.records
            .iter()
            .rev()
            .flat_map(|r| r.participants.iter())
            .find(|p| p.id == id)
            .map(|p| p.label.as_str())
    }

    /// Append a match; it becomes ordinal 1. Rejects a match that would push a
    /// participant's totals past `u64::MAX`.
    pub fn append(&mut self, record: MatchRecord) -> Result<usize> {
        if let Some(id) = self.aggregate.overflowing(&record) {
            return Err(LedgerError::TotalsOverflow { id });
        }
        self.aggregate.apply(&record, Sign::Add);
        self.records.push(record);
        Ok(1)
    }

    pub fn remove_at(&mut self, ordinal: usize) -> Result<MatchRecord> {
        let index = self.index_of(ordinal)?;
        let removed = self.records.remove(index);
        self.aggregate.apply(&removed, Sign::Remove);
        Ok(removed)
    }

    /// Append one entry to an existing match; rejects a participant already in it.
    pub fn add_participant(&mut self, ordinal: usize, entry: ParticipantEntry) -> Result<()> {
        let index = self.index_of(ordinal)?;
        let record = &mut self.records[index];
        if record.has_participant(entry.id) {
            return Err(LedgerError::DuplicateParticipant { id: entry.id, ordinal });
        }
        if !self.aggregate.fits(&entry) {
            return Err(LedgerError::TotalsOverflow { id: entry.id });
        }
        self.aggregate.apply_entry(&entry, Sign::Add);
        record.participants.push(entry);
        Ok(())
    }

    fn clear(&mut self) -> (usize, usize) {
        let counts = (self.records.len(), self.aggregate.len());
        self.records.clear();
        self.aggregate = AggregateIndex::new();
        counts
    }
}

/// The ledger document and its derived aggregate file
#[derive(Debug, Clone)]
struct LedgerFiles {
    ledger: JsonFile,
    aggregate: JsonFile,
}

impl LedgerFiles {
    fn save(&self, state: &LedgerState) -> std::result::Result<(), StorageError> {
        self.ledger.save(&state.records)?;
        // The ledger is authoritative; a stale aggregate file is repaired on next open.
        if let Err(e) = self.aggregate.save(&state.aggregate) {
            warn!(error = %e, "Failed to persist aggregates");
        }
        debug!(matches = state.records.len(), "Ledger persisted");
        Ok(())
    }
}

pub struct LedgerStore {
    state: RwLock<Snapshot>,
    files: LedgerFiles,
}

impl LedgerStore {
    /// Open the store, starting empty if the ledger file is missing or unreadable.
    pub fn open(ledger_path: &Path, aggregate_path: &Path) -> Self {
        let ledger_file = JsonFile::new(ledger_path);
        let aggregate_file = JsonFile::new(aggregate_path);

        let records: Vec<MatchRecord> = ledger_file.load_or_default();
        let state = LedgerState::from_records(records);

        match aggregate_file.load::<AggregateIndex>() {
            Ok(Some(persisted)) if persisted == state.aggregate => {}
            Ok(persisted) => {
                if persisted.is_some() {
                    warn!(
                        path = %aggregate_path.display(),
                        "Persisted aggregates diverge from ledger, rewriting"
                    );
                }
                if let Err(e) = aggregate_file.save(&state.aggregate) {
                    warn!(error = %e, "Failed to write rebuilt aggregates");
                }
            }
            Err(e) => {
                warn!(error = %e, "Unreadable aggregate file, rewriting from ledger");
                if let Err(e) = aggregate_file.save(&state.aggregate) {
                    warn!(error = %e, "Failed to write rebuilt aggregates");
                }
            }
        }

        info!(
            path = %ledger_path.display(),
            matches = state.len(),
            participants = state.aggregate.len(),
            "Ledger loaded"
        );

        Self {
            state: RwLock::new(Arc::new(state)),
            files: LedgerFiles {
                ledger: ledger_file,
                aggregate: aggregate_file,
            },
        }
    }

    /// Consistent view of ledger and aggregates.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    /// Run `f` inside the writer critical section.
    ///
    /// `f` receives a private copy of the state. If it fails nothing changes; if it
    /// succeeds the copy is persisted and then published to readers. File writes run
    /// on the blocking pool while the writer lock is held.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<T>,
    {
        let mut guard = self.state.write().await;
        let mut next = LedgerState::clone(&guard);
        let out = f(&mut next)?;

        let next = Arc::new(next);
        let files = self.files.clone();
        let pending = next.clone();
        tokio::task::spawn_blocking(move || files.save(&pending))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        *guard = next;
        Ok(out)
    }

    pub async fn append(&self, record: MatchRecord) -> Result<usize> {
        self.mutate(|state| state.append(record)).await
    }

    pub async fn remove_at(&self, ordinal: usize) -> Result<MatchRecord> {
        self.mutate(|state| state.remove_at(ordinal)).await
    }

    pub async fn add_participant(&self, ordinal: usize, entry: ParticipantEntry) -> Result<()> {
        self.mutate(|state| state.add_participant(ordinal, entry)).await
    }

    /// Drop every match; returns (matches removed, aggregate entries removed).
    pub async fn reset(&self) -> Result<(usize, usize)> {
        self.mutate(|state| Ok(state.clear())).await
    }
}
