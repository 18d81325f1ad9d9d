use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a chat item.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ParticipantRole {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Ai,
}

impl ParticipantRole {
    /// CSS modifier used by chat items of this role.
    pub fn label(self) -> &'static str {
        match self {
            ParticipantRole::User => "user",
            ParticipantRole::Ai => "ai",
        }
    }
}

/// How the AI response travels from the adapter to the widget.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum DataTransferMode {
    /// Incremental chunks, appended as they arrive
    #[serde(rename = "stream")]
    #[default]
    Stream,
    /// One complete response
    #[serde(rename = "batch")]
    Batch,
}

impl DataTransferMode {
    pub fn label(self) -> &'static str {
        match self {
            DataTransferMode::Stream => "stream",
            DataTransferMode::Batch => "batch",
        }
    }

    /// The other mode.
    pub fn alternate(self) -> Self {
        match self {
            DataTransferMode::Stream => DataTransferMode::Batch,
            DataTransferMode::Batch => DataTransferMode::Stream,
        }
    }

    /// Parses `"stream"` / `"batch"` (case-insensitive). `"fetch"` is accepted as a batch alias.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stream" => Some(DataTransferMode::Stream),
            "batch" | "fetch" => Some(DataTransferMode::Batch),
            _ => None,
        }
    }
}

impl fmt::Display for DataTransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status carried by exported segment items. Only committed items are exported.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum MessageStatus {
    #[serde(rename = "complete")]
    #[default]
    Complete,
}

/// Payload type of AI messages.
///
/// The widget stores and hands back values of this type without inspecting
/// them. Streamed responses are always text, so every payload type must be
/// constructible from the accumulated string.
pub trait AiMessage: Clone + fmt::Debug + PartialEq + Send + Sync + From<String> + 'static {
    /// Text shown inside the chat item when the payload is rendered.
    fn display_text(&self) -> String;
}

impl AiMessage for String {
    fn display_text(&self) -> String {
        self.clone()
    }
}

impl AiMessage for serde_json::Value {
    fn display_text(&self) -> String {
        match self {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Snapshot of one committed chat item.
///
/// This is the unit of the exported conversation history and the format
/// accepted as seed data when a chat is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "participantRole")]
pub enum ChatSegmentItem<M> {
    #[serde(rename = "ai", rename_all = "camelCase")]
    Ai {
        uid: String,
        content: M,
        status: MessageStatus,
        data_transfer_mode: DataTransferMode,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "user", rename_all = "camelCase")]
    User {
        uid: String,
        content: String,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    },
}

impl<M> ChatSegmentItem<M> {
    pub fn uid(&self) -> &str {
        match self {
            ChatSegmentItem::Ai { uid, .. } | ChatSegmentItem::User { uid, .. } => uid,
        }
    }

    pub fn role(&self) -> ParticipantRole {
        match self {
            ChatSegmentItem::Ai { .. } => ParticipantRole::Ai,
            ChatSegmentItem::User { .. } => ParticipantRole::User,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChatSegmentItem::Ai { timestamp, .. } | ChatSegmentItem::User { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Convenience constructor for a committed user message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        ChatSegmentItem::User {
            uid: new_uid(),
            content: content.into(),
            status: MessageStatus::Complete,
            timestamp: Utc::now(),
        }
    }

    /// Convenience constructor for a committed AI message stamped now.
    pub fn ai(content: M, data_transfer_mode: DataTransferMode) -> Self {
        ChatSegmentItem::Ai {
            uid: new_uid(),
            content,
            status: MessageStatus::Complete,
            data_transfer_mode,
            timestamp: Utc::now(),
        }
    }
}

impl<M: AiMessage> ChatSegmentItem<M> {
    /// Text of the item regardless of role.
    pub fn text(&self) -> String {
        match self {
            ChatSegmentItem::Ai { content, .. } => content.display_text(),
            ChatSegmentItem::User { content, .. } => content.clone(),
        }
    }
}

/// Generates a fresh unique id for items and segments.
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_transfer_mode_parse() {
        assert_eq!(DataTransferMode::parse("stream"), Some(DataTransferMode::Stream));
        assert_eq!(DataTransferMode::parse(" Batch "), Some(DataTransferMode::Batch));
        assert_eq!(DataTransferMode::parse("fetch"), Some(DataTransferMode::Batch));
        assert_eq!(DataTransferMode::parse("carrier-pigeon"), None);
    }

    #[test]
    fn test_segment_item_serializes_with_role_tag() {
        let item: ChatSegmentItem<String> =
            ChatSegmentItem::ai("Hi there".to_string(), DataTransferMode::Batch);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["participantRole"], "ai");
        assert_eq!(json["content"], "Hi there");
        assert_eq!(json["status"], "complete");
        assert_eq!(json["dataTransferMode"], "batch");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_user_item_has_no_transfer_mode() {
        let item: ChatSegmentItem<String> = ChatSegmentItem::user("Hello");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["participantRole"], "user");
        assert!(json.get("dataTransferMode").is_none());
    }

    #[test]
    fn test_segment_item_parses_structured_ai_content() {
        let raw = r#"{
            "participantRole": "ai",
            "uid": "a-1",
            "content": {"answer": 42},
            "status": "complete",
            "dataTransferMode": "stream",
            "timestamp": "2024-05-01T10:00:00Z"
        }"#;
        let item: ChatSegmentItem<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(item.uid(), "a-1");
        assert_eq!(item.role(), ParticipantRole::Ai);
        assert_eq!(item.text(), r#"{"answer":42}"#);
    }

    #[test]
    fn test_json_value_display_text_unwraps_strings() {
        let value = serde_json::Value::String("plain".to_string());
        assert_eq!(value.display_text(), "plain");
    }
}
