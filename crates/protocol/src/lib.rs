//! # Context Protocol
//!
//! Shared value types for context retrieval and transcripts.
//!
//! A retrieved snippet travels as a [`ContextFragment`]: a human message that
//! carries the source reference and an assistant acknowledgement. Persisted
//! transcripts store fragments flattened into a list of [`ContextMessage`];
//! [`group_context_messages`] restores the pairing on the way back in.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod ignore_filter;

pub use ignore_filter::{IgnoreFilter, IgnoreRulesError, IGNORE_FILE_NAME};

/// Default assistant acknowledgement paired with every context fragment.
pub const DEFAULT_ASSISTANT_RESPONSE: &str = "Ok.";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Assistant,
}

/// Where a context fragment came from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ContextSource {
    Embeddings,
    FileScan,
    Selection,
    Editor,
    Search,
    User,
}

/// Provenance of a context fragment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextFile {
    pub uri: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    /// Path relative to the repository root.
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ContextSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl ContextFile {
    pub fn new(uri: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            repo_name: None,
            file_name: file_name.into(),
            source: None,
            revision: None,
        }
    }

    #[must_use]
    pub fn with_repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = Some(repo_name.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: ContextSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// One element of a flattened context list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ContextMessage {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ContextFile>,
}

impl ContextMessage {
    pub fn human(text: impl Into<String>, file: Option<ContextFile>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.into(),
            file,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            file: None,
        }
    }

    pub fn is_human(&self) -> bool {
        self.speaker == Speaker::Human
    }
}

/// A retrieved snippet and its paired acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFragment {
    pub human: ContextMessage,
    pub assistant: ContextMessage,
}

impl ContextFragment {
    pub fn new(text: impl Into<String>, file: ContextFile, response: impl Into<String>) -> Self {
        Self {
            human: ContextMessage::human(text, Some(file)),
            assistant: ContextMessage::assistant(response),
        }
    }

    pub fn file(&self) -> Option<&ContextFile> {
        self.human.file.as_ref()
    }

    pub fn into_messages(self) -> [ContextMessage; 2] {
        [self.human, self.assistant]
    }
}

/// Flatten fragments into the persisted human/assistant interleaving.
pub fn flatten_fragments(
    fragments: impl IntoIterator<Item = ContextFragment>,
) -> Vec<ContextMessage> {
    fragments
        .into_iter()
        .flat_map(ContextFragment::into_messages)
        .collect()
}

/// A structural view over a flattened context list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextUnit {
    Pair(ContextFragment),
    Single(ContextMessage),
}

impl ContextUnit {
    /// The message whose provenance decides whether the unit is kept.
    pub fn lead(&self) -> &ContextMessage {
        match self {
            Self::Pair(fragment) => &fragment.human,
            Self::Single(message) => message,
        }
    }

    pub fn push_into(self, out: &mut Vec<ContextMessage>) {
        match self {
            Self::Pair(fragment) => out.extend(fragment.into_messages()),
            Self::Single(message) => out.push(message),
        }
    }
}

/// Re-pair a flattened list.
///
/// A human message carrying file info is paired with the message right after
/// it only when that message is spoken by the assistant; anything else stays
/// a [`ContextUnit::Single`]. Order is preserved.
pub fn group_context_messages(messages: Vec<ContextMessage>) -> Vec<ContextUnit> {
    let mut units = Vec::with_capacity(messages.len());
    let mut iter = messages.into_iter().peekable();
    while let Some(message) = iter.next() {
        let pairs_with_next = message.is_human()
            && message.file.is_some()
            && iter
                .peek()
                .is_some_and(|next| next.speaker == Speaker::Assistant);
        if pairs_with_next {
            if let Some(assistant) = iter.next() {
                units.push(ContextUnit::Pair(ContextFragment {
                    human: message,
                    assistant,
                }));
                continue;
            }
        }
        units.push(ContextUnit::Single(message));
    }
    units
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreciseSymbol {
    pub fully_qualified_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

/// A resolved symbol-level reference used to produce a response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreciseContext {
    pub symbol: PreciseSymbol,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<LineRange>,
    #[serde(default)]
    pub hover_text: Vec<String>,
    #[serde(default)]
    pub definition_snippet: String,
}

/// Identifiers stamped onto both messages of an interaction.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub speaker: Speaker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
}

impl Message {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: Some(text.into()),
            display_text: None,
            metadata: None,
        }
    }

    pub fn assistant(text: Option<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text,
            display_text: None,
            metadata: None,
        }
    }
}

/// A message as rendered into a chat transcript.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub context_files: Vec<ContextFile>,
    #[serde(default)]
    pub precise_context: Vec<PreciseContext>,
}

/// Persisted form of one interaction.
///
/// Serialises `context` as a mirror of `fullContext` for older readers; on
/// read either field is accepted and `fullContext` wins when both exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InteractionRecord", into = "InteractionRecord")]
pub struct InteractionJson {
    pub human_message: Message,
    pub assistant_message: Message,
    pub full_context: Vec<ContextMessage>,
    pub used_context_files: Vec<ContextFile>,
    pub used_precise_context: Vec<PreciseContext>,
    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionRecord {
    human_message: Message,
    assistant_message: Message,
    #[serde(default)]
    full_context: Option<Vec<ContextMessage>>,
    #[serde(default)]
    used_context_files: Vec<ContextFile>,
    #[serde(default)]
    used_precise_context: Vec<PreciseContext>,
    timestamp: String,
    #[serde(default)]
    context: Option<Vec<ContextMessage>>,
}

impl From<InteractionRecord> for InteractionJson {
    fn from(record: InteractionRecord) -> Self {
        Self {
            human_message: record.human_message,
            assistant_message: record.assistant_message,
            full_context: record
                .full_context
                .or(record.context)
                .unwrap_or_default(),
            used_context_files: record.used_context_files,
            used_precise_context: record.used_precise_context,
            timestamp: record.timestamp,
        }
    }
}

impl From<InteractionJson> for InteractionRecord {
    fn from(json: InteractionJson) -> Self {
        Self {
            human_message: json.human_message,
            assistant_message: json.assistant_message,
            context: Some(json.full_context.clone()),
            full_context: Some(json.full_context),
            used_context_files: json.used_context_files,
            used_precise_context: json.used_precise_context,
            timestamp: json.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn file(name: &str) -> ContextFile {
        ContextFile::new(format!("/repo/{name}"), name).with_source(ContextSource::FileScan)
    }

    #[test]
    fn context_message_schema_names_wire_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(ContextMessage)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("speaker").is_some());
        assert!(properties.get("text").is_some());
        assert!(properties.get("file").is_some());
    }

    #[test]
    fn grouping_pairs_human_file_with_following_assistant() {
        let messages = flatten_fragments([
            ContextFragment::new("a", file("a.rs"), "Ok."),
            ContextFragment::new("b", file("b.rs"), "Ok."),
        ]);
        let units = group_context_messages(messages);
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| matches!(u, ContextUnit::Pair(_))));
    }

    #[test]
    fn grouping_does_not_swallow_a_second_human_message() {
        let messages = vec![
            ContextMessage::human("orphan", Some(file("a.rs"))),
            ContextMessage::human("next", Some(file("b.rs"))),
            ContextMessage::assistant("Ok."),
            ContextMessage::assistant("stray"),
        ];
        let units = group_context_messages(messages);
        assert_eq!(units.len(), 3);
        assert!(matches!(&units[0], ContextUnit::Single(m) if m.text == "orphan"));
        assert!(matches!(&units[1], ContextUnit::Pair(p) if p.human.text == "next"));
        assert!(matches!(&units[2], ContextUnit::Single(m) if m.text == "stray"));

        let mut flat = Vec::new();
        for unit in units {
            unit.push_into(&mut flat);
        }
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn context_source_uses_kebab_case() {
        let value = serde_json::to_value(ContextSource::FileScan).unwrap();
        assert_eq!(value, json!("file-scan"));
    }

    #[test]
    fn interaction_json_emits_legacy_context_mirror() {
        let record = InteractionJson {
            human_message: Message::human("hi"),
            assistant_message: Message::assistant(Some("hello".to_string())),
            full_context: flatten_fragments([ContextFragment::new("a", file("a.rs"), "Ok.")]),
            used_context_files: vec![],
            used_precise_context: vec![],
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fullContext"], value["context"]);
        assert_eq!(value["humanMessage"]["speaker"], json!("human"));
        assert_eq!(value["timestamp"], json!("2024-01-01T00:00:00.000Z"));
        assert!(value.get("usedContextFiles").is_some());
        assert!(value.get("usedPreciseContext").is_some());
    }

    #[test]
    fn interaction_json_reads_legacy_context_field() {
        let value = json!({
            "humanMessage": {"speaker": "human", "text": "hi"},
            "assistantMessage": {"speaker": "assistant"},
            "timestamp": "2024-01-01T00:00:00.000Z",
            "context": [
                {"speaker": "human", "text": "a", "file": {"uri": "/repo/a.rs", "fileName": "a.rs"}},
                {"speaker": "assistant", "text": "Ok."}
            ]
        });
        let parsed: InteractionJson = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.full_context.len(), 2);
        assert!(parsed.used_context_files.is_empty());
    }

    #[test]
    fn full_context_wins_over_legacy_field() {
        let value = json!({
            "humanMessage": {"speaker": "human", "text": "hi"},
            "assistantMessage": {"speaker": "assistant"},
            "timestamp": "2024-01-01T00:00:00.000Z",
            "fullContext": [],
            "context": [{"speaker": "assistant", "text": "Ok."}]
        });
        let parsed: InteractionJson = serde_json::from_value(value).unwrap();
        assert!(parsed.full_context.is_empty());
    }
}
