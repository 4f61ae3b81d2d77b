//! Property tests for the ledger, aggregate index, windows and ranking

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use capt_ledger::ledger::{AggregateIndex, LedgerState, MatchRecord, Outcome, ParticipantEntry, Window};
use capt_ledger::ranking::{self, first_appearance, Metric, RankOptions};

#[derive(Debug, Clone)]
enum Op {
    Append(MatchRecord),
    Remove(usize),
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn record_strategy() -> impl Strategy<Value = MatchRecord> {
    (
        0i64..24 * 60,
        any::<bool>(),
        prop::collection::btree_map(1u64..8, (0u64..5_000, 0u64..20), 0..5),
    )
        .prop_map(|(hours_ago, win, players)| {
            let outcome = if win { Outcome::Win } else { Outcome::Loss };
            let mut record = MatchRecord::new("rival", base_time() - Duration::hours(hours_ago), outcome);
            record.participants = players
                .into_iter()
                .map(|(id, (damage, kills))| ParticipantEntry {
                    id,
                    label: format!("p{}", id),
                    damage,
                    kills,
                })
                .collect();
            record
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => record_strategy().prop_map(Op::Append),
        1 => (1usize..6).prop_map(Op::Remove),
    ]
}

proptest! {
    /// Property: the maintained index always equals a full rebuild
    #[test]
    fn prop_incremental_matches_rebuild(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut state = LedgerState::default();
        for op in ops {
            match op {
                Op::Append(record) => {
                    state.append(record).unwrap();
                }
                Op::Remove(ordinal) => {
                    // Out-of-range ordinals must leave the state untouched.
                    let before = state.aggregate().clone();
                    if state.remove_at(ordinal).is_err() {
                        prop_assert_eq!(&before, state.aggregate());
                    }
                }
            }
            prop_assert_eq!(&AggregateIndex::rebuild(state.records()), state.aggregate());
        }
    }

    /// Property: removing a match and appending it again restores the totals
    #[test]
    fn prop_remove_then_reappend_restores(
        records in prop::collection::vec(record_strategy(), 1..12),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut state = LedgerState::from_records(records);
        let before = state.aggregate().clone();

        let ordinal = pick.index(state.len()) + 1;
        let removed = state.remove_at(ordinal).unwrap();
        state.append(removed).unwrap();

        prop_assert_eq!(&before, state.aggregate());
    }

    /// Property: a trailing window only admits records after its cutoff, and
    /// widening it never drops records
    #[test]
    fn prop_window_monotonic(
        records in prop::collection::vec(record_strategy(), 0..30),
        short in 1i64..200,
        extra in 0i64..600,
    ) {
        let now = base_time();
        let narrow = Window::Trailing(Duration::hours(short));
        let wide = Window::Trailing(Duration::hours(short + extra));

        let inside = narrow.filter(&records, now);
        for record in &inside {
            prop_assert!(record.timestamp >= now - Duration::hours(short));
        }
        prop_assert!(inside.len() <= wide.filter(&records, now).len());
        prop_assert!(wide.filter(&records, now).len() <= Window::All.filter(&records, now).len());
    }

    /// Property: boards are bounded, sorted, tie-broken by first appearance
    /// and never show participants under the threshold
    #[test]
    fn prop_ranking_invariants(
        records in prop::collection::vec(record_strategy(), 0..30),
        min_games in 0u64..4,
        kills in any::<bool>(),
    ) {
        let metric = if kills { Metric::TotalKills } else { Metric::AverageDamage };
        let state = LedgerState::from_records(records);
        let board = ranking::leaderboard(
            &state,
            Window::All,
            RankOptions::new(metric).with_min_games(min_games),
            base_time(),
        );
        let first_seen = first_appearance(state.records());

        prop_assert!(board.entries.len() <= ranking::TOP_N);
        for (i, entry) in board.entries.iter().enumerate() {
            prop_assert_eq!(entry.position, i + 1);
            prop_assert!(entry.totals.games >= min_games);
        }
        for pair in board.entries.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
            if pair[0].value == pair[1].value {
                prop_assert!(first_seen[&pair[0].id] < first_seen[&pair[1].id]);
            }
        }
    }
}

#[test]
fn test_average_is_floored() {
    let mut record = MatchRecord::new("rival", base_time(), Outcome::Win);
    record.participants.push(ParticipantEntry { id: 1, label: "a".into(), damage: 1000, kills: 0 });
    let mut second = MatchRecord::new("rival", base_time(), Outcome::Win);
    second.participants.push(ParticipantEntry { id: 1, label: "a".into(), damage: 1001, kills: 0 });
    let mut third = MatchRecord::new("rival", base_time(), Outcome::Win);
    third.participants.push(ParticipantEntry { id: 1, label: "a".into(), damage: 1001, kills: 0 });

    let state = LedgerState::from_records(vec![record, second, third]);
    let board = ranking::leaderboard(&state, Window::All, RankOptions::new(Metric::AverageDamage), base_time());
    assert_eq!(board.entries[0].value, 1000);
}
