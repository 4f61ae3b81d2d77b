//! Published boards
//!
//! Three boards (top average damage, top kills, match history) are kept live
//! on an external channel. Each board is one artifact that is edited in place:
//!
//! ```text
//!   ledger snapshot ──render──▶ text ──▶ Publisher ──edit/send──▶ ArtifactChannel
//!                                          │
//!                                   ArtifactRegistry (board key → artifact)
//! ```

pub mod channel;
pub mod publisher;
pub mod registry;
pub mod render;

pub use channel::{ArtifactChannel, ArtifactRef, ChannelError, FileChannel, RecentArtifact};
pub use publisher::{BoardSettings, PublishOutcome, Publisher};
pub use registry::{ArtifactRegistry, BoardKey, BoardKind};
