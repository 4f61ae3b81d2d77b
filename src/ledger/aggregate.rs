//! Per-participant running totals derived from the ledger
//!
//! The index is a cache: every value can be reproduced with [`AggregateIndex::rebuild`].
//! Mutations of the ledger are mirrored through [`AggregateIndex::apply`] inside the
//! same critical section so the two never disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::model::{MatchRecord, ParticipantEntry, ParticipantId};

/// Direction of an incremental update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Add,
    Remove,
}

/// Totals for one participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub damage: u64,
    pub kills: u64,
    pub games: u64,
}

impl AggregateEntry {
    /// Average damage per game, truncated
    pub fn average_damage(&self) -> u64 {
        if self.games == 0 {
            0
        } else {
            self.damage / self.games
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateIndex {
    entries: BTreeMap<ParticipantId, AggregateEntry>,
}

impl AggregateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from scratch by replaying `records`.
    pub fn rebuild<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchRecord>,
    {
        let mut index = Self::new();
        for record in records {
            index.apply(record, Sign::Add);
        }
        index
    }

    pub fn apply(&mut self, record: &MatchRecord, sign: Sign) {
        for entry in &record.participants {
            self.apply_entry(entry, sign);
        }
    }

    pub fn apply_entry(&mut self, entry: &ParticipantEntry, sign: Sign) {
        match sign {
            Sign::Add => {
                // Callers check `fits` first; saturation only guards replayed files.
                let totals = self.entries.entry(entry.id).or_default();
                totals.damage = totals.damage.saturating_add(entry.damage);
                totals.kills = totals.kills.saturating_add(entry.kills);
                totals.games = totals.games.saturating_add(1);
            }
            Sign::Remove => {
                let Some(totals) = self.entries.get_mut(&entry.id) else {
                    warn!(participant = entry.id, "Reversing contribution of unknown participant");
                    return;
                };
                totals.damage = totals.damage.saturating_sub(entry.damage);
                totals.kills = totals.kills.saturating_sub(entry.kills);
                totals.games = totals.games.saturating_sub(1);
                if totals.games == 0 {
                    self.entries.remove(&entry.id);
                }
            }
        }
    }

    /// Whether adding `entry` keeps the participant's totals representable.
    pub fn fits(&self, entry: &ParticipantEntry) -> bool {
        let totals = self.entries.get(&entry.id).copied().unwrap_or_default();
        totals.damage.checked_add(entry.damage).is_some()
            && totals.kills.checked_add(entry.kills).is_some()
            && totals.games.checked_add(1).is_some()
    }

    /// First participant of `record` whose totals would overflow.
    pub fn overflowing(&self, record: &MatchRecord) -> Option<ParticipantId> {
        record
            .participants
            .iter()
            .find(|entry| !self.fits(entry))
            .map(|entry| entry.id)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&AggregateEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &AggregateEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
