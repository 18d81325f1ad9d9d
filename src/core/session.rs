//! # History Persistence
//!
//! Save/load exported conversations as JSON files.
//!
//! A history file holds lightweight metadata (title, timestamps, message
//! count) plus the [`ChatSegmentItem`] list exactly as
//! [`AiChat::conversation_history`] exports it, so a saved file can be fed
//! straight back into [`AiChat::with_history`].
//!
//! All writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::adapter::{AiMessage, ChatSegmentItem, ParticipantRole};
use crate::core::error::ChatError;
use crate::core::state::AiChat;

const TITLE_MAX_CHARS: usize = 60;

/// Summary metadata for a saved conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryMeta {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub message_count: usize,
    pub adapter_name: String,
}

/// Full history file: metadata + exported items.
#[derive(Serialize, Deserialize, Debug)]
pub struct HistoryFile<M> {
    pub meta: HistoryMeta,
    pub items: Vec<ChatSegmentItem<M>>,
}

/// Generate a new UUID v4 history ID.
pub fn new_history_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive a title from the first user message in the conversation.
/// Returns the first line, truncated to 60 chars.
pub fn derive_title<M: AiMessage>(items: &[ChatSegmentItem<M>]) -> String {
    let Some(first_user) = items.iter().find(|i| i.role() == ParticipantRole::User) else {
        return "Untitled".to_string();
    };
    let text = first_user.text();
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.chars().count() > TITLE_MAX_CHARS {
        let head: String = first_line.chars().take(TITLE_MAX_CHARS - 3).collect();
        return format!("{head}...");
    }
    first_line.to_string()
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Save a conversation to `path`.
///
/// Empty conversations are not written and return `Ok(None)`. Title and
/// creation time are preserved from `existing_meta` when given.
pub fn save_history<M: AiMessage + Serialize>(
    path: &Path,
    items: &[ChatSegmentItem<M>],
    adapter_name: &str,
    existing_meta: Option<&HistoryMeta>,
) -> io::Result<Option<HistoryMeta>> {
    if items.is_empty() {
        return Ok(None);
    }
    let now = Utc::now().timestamp();

    let meta = HistoryMeta {
        id: existing_meta
            .map(|m| m.id.clone())
            .unwrap_or_else(new_history_id),
        title: existing_meta
            .map(|m| m.title.clone())
            .unwrap_or_else(|| derive_title(items)),
        created_at: existing_meta.map(|m| m.created_at).unwrap_or(now),
        updated_at: now,
        message_count: items.len(),
        adapter_name: adapter_name.to_string(),
    };

    let data = HistoryFile {
        meta: meta.clone(),
        items: items.to_vec(),
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    atomic_write_json(path, &data)?;
    debug!("History saved to {} ({} items)", path.display(), items.len());
    Ok(Some(meta))
}

/// Load a history file.
pub fn load_history<M: DeserializeOwned>(path: &Path) -> io::Result<HistoryFile<M>> {
    let json = fs::read_to_string(path)?;
    let data: HistoryFile<M> =
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    info!(
        "Loaded history '{}' ({} items) from {}",
        data.meta.title,
        data.items.len(),
        path.display()
    );
    Ok(data)
}

/// Save the chat's current conversation. This is the single entry point for
/// persistence; call from the host on exit.
pub fn save_chat<M: AiMessage + Serialize>(
    chat: &AiChat<M>,
    path: &Path,
    existing_meta: Option<&HistoryMeta>,
) -> Result<Option<HistoryMeta>, ChatError> {
    let items = chat.conversation_history()?;
    Ok(save_history(path, &items, chat.adapter_name(), existing_meta)?)
}
