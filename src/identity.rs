//! Participant label resolution

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::ledger::ParticipantId;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}

/// Looks up the display label of a participant (e.g. a guild member's nickname).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, id: ParticipantId) -> Result<String, ResolveError>;
}

/// Label used when a participant cannot be resolved
pub fn placeholder_label(template: &str, id: ParticipantId) -> String {
    template.replace("{id}", &id.to_string())
}

/// Resolver backed by a static roster (`id = "label"` pairs).
#[derive(Debug, Clone, Default)]
pub struct RosterResolver {
    labels: HashMap<ParticipantId, String>,
}

#[derive(Deserialize)]
struct RosterFile {
    #[serde(default)]
    members: HashMap<String, String>,
}

impl RosterResolver {
    pub fn new(labels: HashMap<ParticipantId, String>) -> Self {
        Self { labels }
    }

    /// Load a TOML roster:
    ///
    /// ```toml
    /// [members]
    /// 1430087806952411230 = "Nika"
    /// ```
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading roster {}", path.display()))?;
        let file: RosterFile = toml::from_str(&content)
            .with_context(|| format!("parsing roster {}", path.display()))?;

        let mut labels = HashMap::with_capacity(file.members.len());
        for (id, label) in file.members {
            let id: ParticipantId = id
                .parse()
                .with_context(|| format!("roster key '{}' is not a participant id", id))?;
            labels.insert(id, label);
        }
        Ok(Self { labels })
    }
}

#[async_trait]
impl IdentityResolver for RosterResolver {
    async fn resolve(&self, id: ParticipantId) -> Result<String, ResolveError> {
        self.labels.get(&id).cloned().ok_or(ResolveError::NotFound(id))
    }
}
