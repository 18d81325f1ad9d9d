//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;

use crate::adapter::{AiMessage, ChatAdapter};
use crate::core::config::ChatOptions;
use crate::core::state::AiChat;

/// An adapter for tests that never get as far as calling the backend.
/// Both transfer modes report `Unsupported`.
pub struct NoopAdapter;

impl<M: AiMessage> ChatAdapter<M> for NoopAdapter {
    fn name(&self) -> &str {
        "noop"
    }
}

/// Creates an empty text chat with a NoopAdapter and default options.
pub fn test_chat() -> AiChat<String> {
    AiChat::<String>::new(Arc::new(NoopAdapter), ChatOptions::default())
}
