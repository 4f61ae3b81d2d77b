//! Paginated match history
//!
//! A [`HistoryView`] lives as long as the session that shows it (e.g. an
//! interactive message), not as long as the ledger. It keeps its own filtered
//! copy of the ledger and only sees new data on [`HistoryView::refresh`].

use chrono::{DateTime, Utc};

use crate::ledger::{LedgerState, MatchRecord, Outcome, Window};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Ordinal accepted by removal commands (1 = newest in the whole ledger)
    pub ordinal: usize,
    /// Chronological number within the view (1 = oldest)
    pub number: usize,
    pub opponent: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub participants: usize,
    pub damage: u64,
    pub kills: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamSummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage, 0 when there are no matches
    pub win_rate: f64,
}

impl TeamSummary {
    fn of<'a>(records: impl Iterator<Item = &'a MatchRecord>) -> Self {
        let (mut total, mut wins) = (0usize, 0usize);
        for record in records {
            total += 1;
            if record.outcome.is_win() {
                wins += 1;
            }
        }
        let win_rate = if total > 0 {
            wins as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self { total, wins, losses: total - wins, win_rate }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub rows: Vec<HistoryRow>,
    /// 0-based
    pub page: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub summary: TeamSummary,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    window: Window,
    page_size: usize,
    current_page: usize,
    /// Newest first
    rows: Vec<HistoryRow>,
    summary: TeamSummary,
}

impl HistoryView {
    /// Build a view and evaluate it against `state` immediately.
    pub fn new(window: Window, page_size: usize, state: &LedgerState, now: DateTime<Utc>) -> Self {
        let mut view = Self {
            window,
            page_size: page_size.max(1),
            current_page: 0,
            rows: Vec::new(),
            summary: TeamSummary::of(std::iter::empty()),
        };
        view.refresh(state, now);
        view
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// `max(1, ceil(rows / page_size))`
    pub fn total_pages(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    fn last_page(&self) -> usize {
        self.total_pages() - 1
    }

    /// Returns `false` when already on the first page.
    pub fn prev(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Returns `false` when already on the last page.
    pub fn next(&mut self) -> bool {
        if self.current_page < self.last_page() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Re-evaluate the window against the current ledger and clamp the page.
    pub fn refresh(&mut self, state: &LedgerState, now: DateTime<Utc>) {
        let filtered = self.window.filter_indexed(state.records(), now);
        self.summary = TeamSummary::of(filtered.iter().map(|(_, r)| *r));
        self.rows = filtered
            .into_iter()
            .enumerate()
            .rev()
            .map(|(position, (index, record))| HistoryRow {
                ordinal: state.ordinal_of(index),
                number: position + 1,
                opponent: record.opponent.clone(),
                timestamp: record.timestamp,
                outcome: record.outcome,
                participants: record.participants.len(),
                damage: record.total_damage(),
                kills: record.total_kills(),
            })
            .collect();

        self.current_page = self.current_page.min(self.last_page());
    }

    /// The current page.
    pub fn render(&self) -> HistoryPage {
        self.render_page(self.current_page)
    }

    /// Any page; out-of-range pages render empty with accurate metadata.
    pub fn render_page(&self, page: usize) -> HistoryPage {
        let start = page.saturating_mul(self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());
        HistoryPage {
            rows: self.rows[start..end].to_vec(),
            page,
            total_pages: self.total_pages(),
            has_prev: page > 0,
            has_next: page < self.last_page(),
            summary: self.summary,
        }
    }
}
