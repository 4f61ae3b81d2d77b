//! Error types shared across the ledger and publishing layers

use crate::ledger::model::ParticipantId;

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persistence task failed: {0}")]
    Task(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("match #{ordinal} not found (ledger holds {len})")]
    MatchNotFound { ordinal: usize, len: usize },

    #[error("participant {id} not found")]
    ParticipantNotFound { id: ParticipantId },

    #[error("participant {id} is already recorded in match #{ordinal}")]
    DuplicateParticipant { id: ParticipantId, ordinal: usize },

    #[error("totals of participant {id} would overflow")]
    TotalsOverflow { id: ParticipantId },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MatchNotFound { .. } | LedgerError::ParticipantNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::DuplicateParticipant { .. } | LedgerError::TotalsOverflow { .. } => {
                ErrorKind::Conflict
            }
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
