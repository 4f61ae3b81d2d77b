//! capt-ledger: match ledger, leaderboards and live published boards
//!
//! Keeps an append-mostly ledger of team matches ("capts") with per-participant
//! damage and kills, derives running totals from it, ranks participants over
//! trailing time windows and keeps three boards published and up to date on an
//! external channel.

pub mod bulk;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod persist;
pub mod publish;
pub mod ranking;
pub mod scheduler;
pub mod tracker;
pub mod view;

pub use error::{ErrorKind, LedgerError, Result};
pub use tracker::{Tracker, TrackerSettings};
