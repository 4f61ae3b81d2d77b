//! Match ledger - the single source of truth
//!
//! Handles:
//! - Match and participant records (`model`)
//! - Durable, write-through storage (`store`)
//! - Derived per-participant totals (`aggregate`)
//! - Trailing time windows (`window`)

pub mod aggregate;
pub mod model;
pub mod store;
pub mod window;

// Re-exports
pub use aggregate::{AggregateEntry, AggregateIndex, Sign};
pub use model::{MatchRecord, NewMatch, NewParticipant, Outcome, ParticipantEntry, ParticipantId};
pub use store::{LedgerState, LedgerStore, Snapshot};
pub use window::Window;
