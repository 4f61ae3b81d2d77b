//! Ledger records as they are persisted

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stable participant identity (the chat platform's user id)
pub type ParticipantId = u64;

/// Result of a match, persisted as a boolean (`true` = win)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn is_win(self) -> bool {
        matches!(self, Outcome::Win)
    }
}

impl From<bool> for Outcome {
    fn from(win: bool) -> Self {
        if win {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_win()
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" | "w" | "1" | "true" | "победа" | "в" => Ok(Outcome::Win),
            "lose" | "loss" | "l" | "0" | "false" | "поражение" | "п" => Ok(Outcome::Loss),
            other => Err(format!("unknown outcome '{}', expected win or lose", other)),
        }
    }
}

/// One participant's contribution to a match. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub id: ParticipantId,
    /// Display label captured when the entry was written
    pub label: String,
    pub damage: u64,
    pub kills: u64,
}

/// A recorded team engagement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub opponent: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(default)]
    pub participants: Vec<ParticipantEntry>,
}

impl MatchRecord {
    pub fn new(opponent: impl Into<String>, timestamp: DateTime<Utc>, outcome: Outcome) -> Self {
        Self {
            opponent: opponent.into(),
            timestamp,
            outcome,
            participants: Vec::new(),
        }
    }

    pub fn has_participant(&self, id: ParticipantId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn total_damage(&self) -> u64 {
        self.participants.iter().fold(0u64, |sum, p| sum.saturating_add(p.damage))
    }

    pub fn total_kills(&self) -> u64 {
        self.participants.iter().fold(0u64, |sum, p| sum.saturating_add(p.kills))
    }
}

/// Typed arguments for creating a match
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub opponent: String,
    pub outcome: Outcome,
    /// Defaults to the current instant
    pub timestamp: Option<DateTime<Utc>>,
}

/// Typed arguments for adding one participant to an existing match
#[derive(Debug, Clone)]
pub struct NewParticipant {
    /// 1 = most recently added match
    pub ordinal: usize,
    pub id: ParticipantId,
    pub damage: u64,
    pub kills: u64,
}

/// Accepts RFC 3339 as well as offset-less ISO-8601, which is read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Parses the `DD.MM.YYYY HH:MM` / `DD.MM.YYYY` forms used when entering matches by hand.
pub fn parse_match_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%d.%m.%Y %H:%M") {
        return Ok(naive.and_utc());
    }
    chrono::NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| format!("invalid date '{}', expected DD.MM.YYYY [HH:MM]", raw))
}
