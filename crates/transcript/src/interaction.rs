use crate::context_cache::{ContextCache, ContextState};
use crate::error::{Result, TranscriptError};
use crate::filter::filter_ignored_context;
use chrono::{DateTime, SecondsFormat, Utc};
use context_protocol::{
    ChatMessage, ChatMetadata, ContextFile, ContextMessage, IgnoreFilter, InteractionJson,
    Message, PreciseContext,
};
use std::future::Future;
use std::sync::Arc;

/// One conversational turn: a human/assistant message pair plus its context
///
/// Context arrives as a future and is resolved on first read. Every read
/// re-applies the ignore filter and caches the filtered list, so repeated
/// reads settle on the same sequence.
pub struct Interaction {
    human_message: Message,
    assistant_message: Message,
    context: ContextCache,
    used_context_files: Vec<ContextFile>,
    used_precise_context: Vec<PreciseContext>,
    timestamp: DateTime<Utc>,
    ignore: Arc<IgnoreFilter>,
}

impl Interaction {
    pub fn new<F>(
        human_message: Message,
        assistant_message: Message,
        context: F,
        ignore: Arc<IgnoreFilter>,
    ) -> Self
    where
        F: Future<Output = Vec<ContextMessage>> + Send + 'static,
    {
        Self::with_cache(
            human_message,
            assistant_message,
            ContextCache::pending(Box::pin(context)),
            ignore,
        )
    }

    pub fn with_resolved_context(
        human_message: Message,
        assistant_message: Message,
        context: Vec<ContextMessage>,
        ignore: Arc<IgnoreFilter>,
    ) -> Self {
        Self::with_cache(
            human_message,
            assistant_message,
            ContextCache::resolved(context),
            ignore,
        )
    }

    fn with_cache(
        human_message: Message,
        assistant_message: Message,
        context: ContextCache,
        ignore: Arc<IgnoreFilter>,
    ) -> Self {
        Self {
            human_message,
            assistant_message,
            context,
            used_context_files: Vec::new(),
            used_precise_context: Vec::new(),
            timestamp: Utc::now(),
            ignore,
        }
    }

    /// Rebuild a persisted interaction; its context counts as resolved.
    pub fn from_json(json: InteractionJson, ignore: Arc<IgnoreFilter>) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&json.timestamp)
            .map_err(|source| TranscriptError::InvalidTimestamp {
                value: json.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);
        let mut interaction = Self::with_resolved_context(
            json.human_message,
            json.assistant_message,
            json.full_context,
            ignore,
        );
        interaction.timestamp = timestamp;
        interaction.set_used_context(json.used_context_files, json.used_precise_context);
        Ok(interaction)
    }

    pub fn human_message(&self) -> &Message {
        &self.human_message
    }

    pub fn assistant_message(&self) -> &Message {
        &self.assistant_message
    }

    pub fn set_human_message(&mut self, message: Message) {
        self.human_message = message;
    }

    pub fn set_assistant_message(&mut self, message: Message) {
        self.assistant_message = message;
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    pub fn used_context_files(&self) -> &[ContextFile] {
        &self.used_context_files
    }

    pub fn used_precise_context(&self) -> &[PreciseContext] {
        &self.used_precise_context
    }

    /// Filtered context; the returned list is a copy.
    pub async fn get_full_context(&self) -> Vec<ContextMessage> {
        self.context
            .update(|messages| filter_ignored_context(messages, &self.ignore))
            .await
    }

    pub async fn has_context(&self) -> bool {
        !self.get_full_context().await.is_empty()
    }

    /// Record what was actually consulted for the response.
    pub fn set_used_context(&mut self, files: Vec<ContextFile>, precise: Vec<PreciseContext>) {
        self.used_context_files = files;
        self.used_precise_context = precise;
    }

    /// Stamp both messages with the same metadata.
    pub fn set_metadata(&mut self, metadata: ChatMetadata) {
        self.human_message.metadata = Some(metadata.clone());
        self.assistant_message.metadata = Some(metadata);
    }

    /// Render the message pair; does not wait for context.
    pub fn to_chat(&self) -> [ChatMessage; 2] {
        [
            self.render(&self.human_message),
            self.render(&self.assistant_message),
        ]
    }

    fn render(&self, message: &Message) -> ChatMessage {
        ChatMessage {
            message: message.clone(),
            context_files: self.used_context_files.clone(),
            precise_context: self.used_precise_context.clone(),
        }
    }

    /// Persistable form; context is written as cached, without filtering.
    pub async fn to_json(&self) -> InteractionJson {
        InteractionJson {
            human_message: self.human_message.clone(),
            assistant_message: self.assistant_message.clone(),
            full_context: self.context.snapshot().await,
            used_context_files: self.used_context_files.clone(),
            used_precise_context: self.used_precise_context.clone(),
            timestamp: format_timestamp(self.timestamp),
        }
    }
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("human_message", &self.human_message)
            .field("assistant_message", &self.assistant_message)
            .field("context", &self.context.state())
            .field("used_context_files", &self.used_context_files.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
