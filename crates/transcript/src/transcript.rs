use crate::error::Result;
use crate::interaction::{format_timestamp, Interaction};
use chrono::Utc;
use context_protocol::{ChatMessage, IgnoreFilter, InteractionJson};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ordered sequence of interactions
#[derive(Debug)]
pub struct Transcript {
    id: String,
    interactions: Vec<Interaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptJson {
    pub id: String,
    pub interactions: Vec<InteractionJson>,
    pub last_interaction_timestamp: String,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// New transcript identified by its creation time.
    pub fn new() -> Self {
        Self::with_id(format_timestamp(Utc::now()))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            interactions: Vec::new(),
        }
    }

    pub fn from_json(json: TranscriptJson, ignore: Arc<IgnoreFilter>) -> Result<Self> {
        let interactions = json
            .interactions
            .into_iter()
            .map(|interaction| Interaction::from_json(interaction, Arc::clone(&ignore)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: json.id,
            interactions,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn last_interaction(&self) -> Option<&Interaction> {
        self.interactions.last()
    }

    pub fn last_interaction_mut(&mut self) -> Option<&mut Interaction> {
        self.interactions.last_mut()
    }

    pub fn to_chat(&self) -> Vec<ChatMessage> {
        self.interactions
            .iter()
            .flat_map(Interaction::to_chat)
            .collect()
    }

    pub async fn to_json(&self) -> TranscriptJson {
        let mut interactions = Vec::with_capacity(self.interactions.len());
        for interaction in &self.interactions {
            interactions.push(interaction.to_json().await);
        }
        let last_interaction_timestamp = self
            .interactions
            .last()
            .map_or_else(|| self.id.clone(), |last| format_timestamp(last.timestamp()));
        TranscriptJson {
            id: self.id.clone(),
            interactions,
            last_interaction_timestamp,
        }
    }
}
