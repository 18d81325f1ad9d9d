use std::fmt;

use crate::ui::component::CompError;

/// Errors surfaced by the chat to its host.
///
/// Adapter failures never appear here: they are recovered inside the chat
/// and reach the host through the error callback, or through
/// `ChatHost::halted_by` under the fatal policy.
#[derive(Debug)]
pub enum ChatError {
    /// Component lifecycle misuse (destroyed component, unknown action, ...).
    Component(CompError),
    /// Mount target with this id is absent from the document.
    MissingRootElement(String),
    /// Seed conversation could not be turned into segments.
    InvalidInitialConversation(String),
    Io(std::io::Error),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Component(e) => write!(f, "component error: {e}"),
            ChatError::MissingRootElement(id) => {
                write!(f, "root element '{id}' not found in document")
            }
            ChatError::InvalidInitialConversation(reason) => {
                write!(f, "invalid initial conversation: {reason}")
            }
            ChatError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Component(e) => Some(e),
            ChatError::Io(e) => Some(e),
            ChatError::MissingRootElement(_) | ChatError::InvalidInitialConversation(_) => None,
        }
    }
}

impl From<CompError> for ChatError {
    fn from(e: CompError) -> Self {
        ChatError::Component(e)
    }
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Io(e)
    }
}
