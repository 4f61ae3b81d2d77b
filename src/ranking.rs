//! Leaderboard ranking over aggregate totals

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crate::ledger::{AggregateEntry, AggregateIndex, LedgerState, MatchRecord, ParticipantId, Window};

/// Default board size
pub const TOP_N: usize = 10;
/// Games required before a participant appears on the average-damage board
pub const DEFAULT_MIN_GAMES_AVERAGE: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Total damage / games, truncated
    AverageDamage,
    TotalKills,
}

impl Metric {
    pub fn value(&self, totals: &AggregateEntry) -> u64 {
        match self {
            Metric::AverageDamage => totals.average_damage(),
            Metric::TotalKills => totals.kills,
        }
    }

    pub fn default_min_games(&self) -> u64 {
        match self {
            Metric::AverageDamage => DEFAULT_MIN_GAMES_AVERAGE,
            Metric::TotalKills => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    pub metric: Metric,
    pub min_games: u64,
    pub limit: usize,
}

impl RankOptions {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            min_games: metric.default_min_games(),
            limit: TOP_N,
        }
    }

    pub fn with_min_games(mut self, min_games: u64) -> Self {
        self.min_games = min_games;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based
    pub position: usize,
    pub id: ParticipantId,
    pub value: u64,
    pub totals: AggregateEntry,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub metric: Metric,
    pub window: Window,
    pub min_games: u64,
    /// Board size requested; `entries` may be shorter
    pub limit: usize,
    pub entries: Vec<RankedEntry>,
}

/// Order in which participants first show up in `records`.
pub fn first_appearance<'a, I>(records: I) -> HashMap<ParticipantId, usize>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let mut seen = HashMap::new();
    for entry in records.into_iter().flat_map(|r| r.participants.iter()) {
        let next = seen.len();
        seen.entry(entry.id).or_insert(next);
    }
    seen
}

/// Full ordering after the threshold, before truncation.
///
/// Sorted descending by metric; equal values keep first-appearance order.
pub fn ordering(
    aggregate: &AggregateIndex,
    first_seen: &HashMap<ParticipantId, usize>,
    metric: Metric,
    min_games: u64,
) -> Vec<(ParticipantId, AggregateEntry)> {
    let mut rows: Vec<(ParticipantId, AggregateEntry)> = aggregate
        .iter()
        .filter(|(_, totals)| totals.games >= min_games)
        .map(|(id, totals)| (id, *totals))
        .collect();

    let appearance = |id: &ParticipantId| first_seen.get(id).copied().unwrap_or(usize::MAX);
    rows.sort_by(|(a_id, a), (b_id, b)| {
        metric
            .value(b)
            .cmp(&metric.value(a))
            .then_with(|| appearance(a_id).cmp(&appearance(b_id)))
    });
    rows
}

pub fn rank(
    aggregate: &AggregateIndex,
    first_seen: &HashMap<ParticipantId, usize>,
    options: RankOptions,
) -> Vec<RankedEntry> {
    ordering(aggregate, first_seen, options.metric, options.min_games)
        .into_iter()
        .take(options.limit)
        .enumerate()
        .map(|(i, (id, totals))| RankedEntry {
            position: i + 1,
            id,
            value: options.metric.value(&totals),
            totals,
        })
        .collect()
}

/// Aggregates and appearance order for the records inside `window`.
///
/// The unbounded window reuses the maintained index instead of replaying.
pub fn windowed_totals(
    state: &LedgerState,
    window: Window,
    now: DateTime<Utc>,
) -> (AggregateIndex, HashMap<ParticipantId, usize>) {
    match window {
        Window::All => (state.aggregate().clone(), first_appearance(state.records())),
        _ => {
            let records = window.filter(state.records(), now);
            let aggregate = AggregateIndex::rebuild(records.iter().copied());
            (aggregate, first_appearance(records))
        }
    }
}

pub fn leaderboard(
    state: &LedgerState,
    window: Window,
    options: RankOptions,
    now: DateTime<Utc>,
) -> Leaderboard {
    let (aggregate, first_seen) = windowed_totals(state, window, now);
    Leaderboard {
        metric: options.metric,
        window,
        min_games: options.min_games,
        limit: options.limit,
        entries: rank(&aggregate, &first_seen, options),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalStats {
    pub id: ParticipantId,
    pub totals: AggregateEntry,
    pub average_damage: u64,
    /// Only set once the average-damage threshold is met
    pub average_position: Option<usize>,
    pub kills_position: Option<usize>,
}

/// One participant's totals and board positions within `window`.
pub fn personal_stats(
    state: &LedgerState,
    id: ParticipantId,
    window: Window,
    min_games_average: u64,
    now: DateTime<Utc>,
) -> Option<PersonalStats> {
    let (aggregate, first_seen) = windowed_totals(state, window, now);
    let totals = *aggregate.get(id)?;

    let position_in = |metric: Metric, min_games: u64| {
        ordering(&aggregate, &first_seen, metric, min_games)
            .iter()
            .position(|(pid, _)| *pid == id)
            .map(|i| i + 1)
    };

    Some(PersonalStats {
        id,
        totals,
        average_damage: totals.average_damage(),
        average_position: position_in(Metric::AverageDamage, min_games_average),
        kills_position: position_in(Metric::TotalKills, 0),
    })
}
