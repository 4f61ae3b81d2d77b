//! Line-oriented bulk input
//!
//! Two formats are accepted:
//!
//! ```text
//! # participant upload, appended to one existing match
//! 1430087806952411230 12.5k 4
//! 1174342391184908338 9800 2
//!
//! # match import, one header per match
//! Family Vipers 12.03.2025 21:00 win
//! 1430087806952411230 12k 4
//! Family Wolves lose
//! 1174342391184908338 9800 2
//! ```
//!
//! Parsing never stops at a bad line: every failure is reported with its
//! 1-based line number and the remaining lines are still used.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::ledger::model::parse_match_date;
use crate::ledger::{Outcome, ParticipantId};

pub const DEFAULT_HEADER_KEYWORD: &str = "Family";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkLineError {
    #[error("expected `id damage kills`, found {found} fields")]
    WrongFieldCount { found: usize },

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("participant {0} not found")]
    UnknownParticipant(ParticipantId),

    #[error("participant {0} is already in this match")]
    DuplicateInMatch(ParticipantId),

    #[error("participant {0} appears twice in this upload")]
    DuplicateInBatch(ParticipantId),

    #[error("participant line before any match header")]
    OutsideMatch,

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// 1-based
    pub line: usize,
    pub raw: String,
    pub error: BulkLineError,
}

impl fmt::Display for LineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.error, self.raw)
    }
}

/// Partial-success result of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Participants (upload) or matches (import) committed
    pub added: usize,
    pub failures: Vec<LineFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantLine {
    pub line: usize,
    pub raw: String,
    pub id: ParticipantId,
    pub damage: u64,
    pub kills: u64,
}

impl ParticipantLine {
    pub fn fail(&self, error: BulkLineError) -> LineFailure {
        LineFailure {
            line: self.line,
            raw: self.raw.clone(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedMatch {
    /// Line of the header
    pub line: usize,
    pub header: String,
    pub opponent: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub participants: Vec<ParticipantLine>,
}

/// `"12k"` → 12000, `"12.5k"` → 12500, `"9800"` → 9800
pub fn parse_amount(raw: &str) -> Option<u64> {
    let Some(base) = raw.strip_suffix(['k', 'K']) else {
        return raw.parse().ok();
    };
    match base.split_once('.') {
        None => base.parse::<u64>().ok()?.checked_mul(1000),
        Some((whole, frac)) => {
            if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
            let frac: u64 = format!("{:0<3}", frac).parse().ok()?;
            whole.checked_mul(1000)?.checked_add(frac)
        }
    }
}

/// Parse one `id damage kills` line.
pub fn parse_participant_fields(raw: &str) -> Result<(ParticipantId, u64, u64), BulkLineError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    let [id, damage, kills] = fields[..] else {
        return Err(BulkLineError::WrongFieldCount { found: fields.len() });
    };
    let invalid = |field, value: &str| BulkLineError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    let id = id.parse().map_err(|_| invalid("id", id))?;
    let damage = parse_amount(damage).ok_or_else(|| invalid("damage", damage))?;
    let kills = kills.parse().map_err(|_| invalid("kills", kills))?;
    Ok((id, damage, kills))
}

fn participant_line(
    line: usize,
    raw: &str,
    seen: &mut HashSet<ParticipantId>,
) -> Result<ParticipantLine, LineFailure> {
    let fail = |error| LineFailure {
        line,
        raw: raw.to_string(),
        error,
    };
    let (id, damage, kills) = parse_participant_fields(raw).map_err(fail)?;
    if !seen.insert(id) {
        return Err(fail(BulkLineError::DuplicateInBatch(id)));
    }
    Ok(ParticipantLine {
        line,
        raw: raw.to_string(),
        id,
        damage,
        kills,
    })
}

/// Parse a participant upload. Blank lines are skipped.
pub fn parse_participants(text: &str) -> (Vec<ParticipantLine>, Vec<LineFailure>) {
    let mut parsed = Vec::new();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match participant_line(idx + 1, raw, &mut seen) {
            Ok(line) => parsed.push(line),
            Err(failure) => failures.push(failure),
        }
    }
    (parsed, failures)
}

/// Strip a case-insensitive `keyword` prefix.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let mut chars = line.char_indices();
    for expected in keyword.chars() {
        let (_, c) = chars.next()?;
        if !c.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let rest = chars.next().map_or("", |(i, _)| &line[i..]);
    Some(rest)
}

fn outcome_marker(token: &str) -> Option<Outcome> {
    match token.to_lowercase().as_str() {
        "win" | "победа" => Some(Outcome::Win),
        "lose" | "loss" | "поражение" => Some(Outcome::Loss),
        _ => None,
    }
}

/// Split a header remainder into opponent, timestamp and outcome marker.
fn parse_header(rest: &str, default_outcome: Outcome) -> (String, Option<DateTime<Utc>>, Outcome) {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let mut opponent = Vec::new();
    let mut timestamp = None;
    let mut outcome = default_outcome;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if timestamp.is_none() && i + 1 < tokens.len() {
            if let Ok(ts) = parse_match_date(&format!("{} {}", token, tokens[i + 1])) {
                timestamp = Some(ts);
                i += 2;
                continue;
            }
        }
        if let Some(marker) = outcome_marker(token) {
            outcome = marker;
        } else {
            opponent.push(token);
        }
        i += 1;
    }

    let opponent = if opponent.is_empty() {
        "Unknown".to_string()
    } else {
        opponent.join(" ")
    };
    (opponent, timestamp, outcome)
}

/// Parse a multi-match import. Headers without participants are dropped.
pub fn parse_import(
    text: &str,
    keyword: &str,
    default_outcome: Outcome,
) -> (Vec<ImportedMatch>, Vec<LineFailure>) {
    let mut matches: Vec<ImportedMatch> = Vec::new();
    let mut failures = Vec::new();
    let mut current: Option<ImportedMatch> = None;
    let mut seen = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        if let Some(rest) = strip_keyword(raw, keyword) {
            matches.extend(current.take().filter(|m| !m.participants.is_empty()));
            seen.clear();
            let (opponent, timestamp, outcome) = parse_header(rest, default_outcome);
            current = Some(ImportedMatch {
                line,
                header: raw.to_string(),
                opponent,
                timestamp,
                outcome,
                participants: Vec::new(),
            });
            continue;
        }

        let Some(open) = current.as_mut() else {
            failures.push(LineFailure {
                line,
                raw: raw.to_string(),
                error: BulkLineError::OutsideMatch,
            });
            continue;
        };
        match participant_line(line, raw, &mut seen) {
            Ok(parsed) => open.participants.push(parsed),
            Err(failure) => failures.push(failure),
        }
    }
    matches.extend(current.filter(|m| !m.participants.is_empty()));

    (matches, failures)
}
