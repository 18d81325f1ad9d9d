use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::types::{AiMessage, ChatSegmentItem, DataTransferMode};

/// Errors an adapter can report for a submission.
/// Every variant is recovered by the chat: the segment is discarded and the
/// composer text restored.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// The backend refused the prompt (bad request, content policy, ...).
    Rejected(String),
    /// Transport-level failure (timeout, DNS, connection refused).
    Network(String),
    /// The adapter does not implement the configured data-transfer mode.
    Unsupported(DataTransferMode),
    /// The chunk channel closed before the stream finished (chat went away).
    ChannelClosed,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Rejected(msg) => write!(f, "adapter rejected the prompt: {msg}"),
            AdapterError::Network(msg) => write!(f, "network error: {msg}"),
            AdapterError::Unsupported(mode) => {
                write!(f, "adapter does not support {mode} data transfer")
            }
            AdapterError::ChannelClosed => write!(f, "chunk channel closed"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Everything an adapter receives for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest<M> {
    /// Segment the response belongs to.
    pub segment_uid: String,
    pub prompt: String,
    /// Committed items of all complete segments, oldest first.
    pub history: Vec<ChatSegmentItem<M>>,
}

/// The narrow contract between the chat and an AI backend.
///
/// Implementations may support one or both transfer modes; the default
/// method bodies report [`AdapterError::Unsupported`]. An adapter that
/// implements only one mode overrides [`ChatAdapter::supports`] so the chat
/// can fall back to it whatever mode is configured.
///
/// The stream variant maps the callback triple onto channel + return value:
/// every `send` on `sender` is one chunk (in order), returning `Ok(())` is the
/// completion signal and returning `Err` is the error signal. Exactly one of
/// the two terminal outcomes happens per call, and no chunk can be observed
/// after it because the sender is dropped when the future resolves.
#[async_trait]
pub trait ChatAdapter<M: AiMessage>: Send + Sync {
    /// Returns the name of the adapter (used in logs).
    fn name(&self) -> &str;

    /// Whether this adapter implements `mode`. Defaults to both.
    fn supports(&self, mode: DataTransferMode) -> bool {
        let _ = mode;
        true
    }

    /// Produces the complete response once.
    async fn batch_text(&self, request: PromptRequest<M>) -> Result<M, AdapterError> {
        let _ = request;
        Err(AdapterError::Unsupported(DataTransferMode::Batch))
    }

    /// Streams the response as text chunks into `sender`.
    async fn stream_text(
        &self,
        request: PromptRequest<M>,
        sender: Sender<String>,
    ) -> Result<(), AdapterError> {
        let _ = (request, sender);
        Err(AdapterError::Unsupported(DataTransferMode::Stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BatchOnly;

    #[async_trait]
    impl ChatAdapter<String> for BatchOnly {
        fn name(&self) -> &str {
            "batch-only"
        }

        fn supports(&self, mode: DataTransferMode) -> bool {
            mode == DataTransferMode::Batch
        }

        async fn batch_text(&self, request: PromptRequest<String>) -> Result<String, AdapterError> {
            Ok(request.prompt.to_uppercase())
        }
    }

    struct Both;

    #[async_trait]
    impl ChatAdapter<String> for Both {
        fn name(&self) -> &str {
            "both"
        }
    }

    fn request(prompt: &str) -> PromptRequest<String> {
        PromptRequest {
            segment_uid: "s-1".to_string(),
            prompt: prompt.to_string(),
            history: vec![],
        }
    }

    #[tokio::test]
    async fn test_unimplemented_stream_reports_unsupported() {
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let err = BatchOnly.stream_text(request("hi"), tx).await.unwrap_err();
        assert_eq!(err, AdapterError::Unsupported(DataTransferMode::Stream));
    }

    #[tokio::test]
    async fn test_batch_implementation_is_used() {
        let reply = BatchOnly.batch_text(request("hi")).await.unwrap();
        assert_eq!(reply, "HI");
    }

    #[test]
    fn test_supports_defaults_to_both_modes() {
        assert!(Both.supports(DataTransferMode::Stream));
        assert!(Both.supports(DataTransferMode::Batch));
        assert!(!BatchOnly.supports(DataTransferMode::Stream));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AdapterError::Unsupported(DataTransferMode::Batch).to_string(),
            "adapter does not support batch data transfer"
        );
        assert_eq!(AdapterError::Network("timeout".into()).to_string(), "network error: timeout");
    }
}
