//! Trailing time windows over the ledger

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use super::model::MatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    All,
    /// Trailing 7 days
    Week,
    /// Trailing 30 days
    Month,
    Trailing(Duration),
}

impl Window {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Window::All => None,
            Window::Week => Some(Duration::days(7)),
            Window::Month => Some(Duration::days(30)),
            Window::Trailing(d) => Some(*d),
        }
    }

    /// Earliest timestamp still inside the window. A window reaching past the
    /// representable range has no cutoff and behaves like [`Window::All`].
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration().and_then(|d| now.checked_sub_signed(d))
    }

    /// Records with `timestamp >= now - duration`, in ledger order.
    pub fn filter<'a>(&self, records: &'a [MatchRecord], now: DateTime<Utc>) -> Vec<&'a MatchRecord> {
        self.filter_indexed(records, now)
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Like [`Window::filter`] but keeps each record's position in the ledger.
    pub fn filter_indexed<'a>(
        &self,
        records: &'a [MatchRecord],
        now: DateTime<Utc>,
    ) -> Vec<(usize, &'a MatchRecord)> {
        match self.cutoff(now) {
            None => records.iter().enumerate().collect(),
            Some(cutoff) => records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.timestamp >= cutoff)
                .collect(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Window::All => "all time".to_string(),
            Window::Week => "last week".to_string(),
            Window::Month => "last month".to_string(),
            Window::Trailing(d) if d.num_hours() % 24 == 0 => format!("last {} days", d.num_days()),
            Window::Trailing(d) => format!("last {} hours", d.num_hours()),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" => return Ok(Window::All),
            "week" => return Ok(Window::Week),
            "month" => return Ok(Window::Month),
            _ => {}
        }

        let invalid = || format!("invalid window '{}', expected all, week, month, <n>d or <n>h", s);
        let unit = s.chars().last().ok_or_else(invalid)?;
        let amount: u32 = s[..s.len() - unit.len_utf8()].parse().map_err(|_| invalid())?;
        match unit {
            'd' => Ok(Window::Trailing(Duration::days(amount.into()))),
            'h' => Ok(Window::Trailing(Duration::hours(amount.into()))),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::model::Outcome;

    fn at(now: DateTime<Utc>, days_ago: i64) -> MatchRecord {
        MatchRecord::new("X", now - Duration::days(days_ago), Outcome::Win)
    }

    #[test]
    fn test_week_window_uses_timestamps_not_order() {
        let now = Utc::now();
        // insertion order deliberately differs from timestamp order
        let records = vec![at(now, 2), at(now, 20), at(now, 6), at(now, 8)];

        let week = Window::Week.filter_indexed(&records, now);
        let positions: Vec<usize> = week.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![0, 2]);

        let month = Window::Month.filter(&records, now);
        assert_eq!(month.len(), 4);
    }

    #[test]
    fn test_all_returns_everything() {
        let now = Utc::now();
        let records = vec![at(now, 400), at(now, 1)];
        assert_eq!(Window::All.filter(&records, now).len(), 2);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = Utc::now();
        let records = vec![at(now, 7)];
        assert_eq!(Window::Week.filter(&records, now).len(), 1);
    }

    #[test]
    fn test_parse_windows() {
        assert_eq!("week".parse::<Window>().unwrap(), Window::Week);
        assert_eq!("14d".parse::<Window>().unwrap(), Window::Trailing(Duration::days(14)));
        assert_eq!("12h".parse::<Window>().unwrap(), Window::Trailing(Duration::hours(12)));
        assert!("fortnight".parse::<Window>().is_err());
    }

    #[test]
    fn test_huge_window_is_unbounded() {
        let now = Utc::now();
        let records = vec![at(now, 1), at(now, 4000)];
        let window: Window = "100000000d".parse().unwrap();

        assert_eq!(window.cutoff(now), None);
        assert_eq!(window.filter(&records, now).len(), 2);
    }
}
