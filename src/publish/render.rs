//! Plain-text rendering of boards
//!
//! The first line of every rendered board is its title; fallback discovery
//! relies on that.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::registry::BoardKind;
use crate::ranking::{Leaderboard, Metric};
use crate::view::HistoryPage;

const BAR_LENGTH: usize = 10;

/// Board title; `top_n` only applies to leaderboards.
pub fn title(board: BoardKind, top_n: usize) -> String {
    match board {
        BoardKind::AverageDamage => format!("TOP-{} AVERAGE DAMAGE", top_n),
        BoardKind::Kills => format!("TOP-{} KILLS", top_n),
        BoardKind::History => "MATCH HISTORY".to_string(),
    }
}

/// `█` for the filled share, `░` for the rest.
pub fn progress_bar(percent: u64, length: usize) -> String {
    let filled = ((percent.min(100) as usize) * length) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(length - filled))
}

/// `1234567` → `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn medal(position: usize) -> &'static str {
    match position {
        1 => "🥇 ",
        2 => "🥈 ",
        3 => "🥉 ",
        _ => "",
    }
}

/// Render a leaderboard; `label` maps participant ids to display names.
pub fn leaderboard<F>(board: &Leaderboard, label: F, now: DateTime<Utc>) -> String
where
    F: Fn(u64) -> String,
{
    let kind = match board.metric {
        Metric::AverageDamage => BoardKind::AverageDamage,
        Metric::TotalKills => BoardKind::Kills,
    };
    let mut out = String::new();
    let _ = writeln!(out, "{}", title(kind, board.limit));
    let _ = writeln!(out, "Statistics for {}", board.window);
    out.push('\n');

    if board.entries.is_empty() {
        match board.metric {
            Metric::AverageDamage => {
                let _ = writeln!(out, "No participants with {}+ games yet", board.min_games);
            }
            Metric::TotalKills => out.push_str("No statistics yet\n"),
        }
    }

    let leader = board.entries.first().map(|e| e.value).unwrap_or(0);
    for entry in &board.entries {
        let percent = if leader > 0 {
            (u128::from(entry.value) * 100 / u128::from(leader)) as u64
        } else {
            0
        };
        let _ = writeln!(out, "{}{}. {}", medal(entry.position), entry.position, label(entry.id));
        let _ = match board.metric {
            Metric::AverageDamage => writeln!(
                out,
                "{} {} damage ({} games)",
                progress_bar(percent, BAR_LENGTH),
                thousands(entry.value),
                entry.totals.games
            ),
            Metric::TotalKills => writeln!(
                out,
                "{} {} kills ({} games)",
                progress_bar(percent, BAR_LENGTH),
                entry.value,
                entry.totals.games
            ),
        };
    }

    out.push('\n');
    if board.metric == Metric::AverageDamage && board.min_games > 0 {
        let _ = writeln!(out, "Minimum {} games", board.min_games);
    }
    let _ = write!(out, "Updated {}", now.format("%d.%m.%Y %H:%M UTC"));
    out
}

pub fn history(page: &HistoryPage, window_label: &str, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title(BoardKind::History, 0));
    let _ = writeln!(out, "Matches for {}", window_label);
    out.push('\n');

    if page.rows.is_empty() {
        out.push_str("No matches in this period\n");
    }
    for row in &page.rows {
        let result = if row.outcome.is_win() { "WIN" } else { "LOSS" };
        let _ = writeln!(out, "#{}. vs {} [{}] (ordinal {})", row.number, row.opponent, result, row.ordinal);
        let _ = writeln!(
            out,
            "{} | {} players | {} damage | {} kills",
            row.timestamp.format("%d.%m.%Y %H:%M"),
            row.participants,
            thousands(row.damage),
            row.kills
        );
    }

    if page.summary.total > 0 {
        let s = &page.summary;
        out.push('\n');
        let _ = writeln!(out, "Total:  {}", s.total);
        let _ = writeln!(out, "Wins:   {}", s.wins);
        let _ = writeln!(out, "Losses: {}", s.losses);
        let _ = writeln!(out, "Win rate: {:.1}%", s.win_rate);
    }

    out.push('\n');
    let _ = write!(
        out,
        "Page {}/{} | Updated {}",
        page.page + 1,
        page.total_pages,
        now.format("%d.%m.%Y %H:%M UTC")
    );
    out
}
