//! Reference adapter that answers by echoing the prompt.
//!
//! Used by the demo binary and handy when wiring a host without a backend.
//! Supports both transfer modes: batch returns the whole reply, stream sends
//! it word by word with an optional delay between chunks.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc::Sender;

use crate::adapter::{AdapterError, AiMessage, ChatAdapter, PromptRequest};

pub struct EchoAdapter {
    chunk_delay: Duration,
}

impl EchoAdapter {
    pub fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }

    fn reply_for<M>(request: &PromptRequest<M>) -> String {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return "You said nothing at all.".to_string();
        }
        let earlier = request.history.len() / 2;
        if earlier == 0 {
            format!("You said: {prompt}")
        } else {
            format!("You said: {prompt} (after {earlier} earlier exchanges)")
        }
    }
}

impl Default for EchoAdapter {
    fn default() -> Self {
        Self::new(Duration::from_millis(40))
    }
}

#[async_trait]
impl<M: AiMessage> ChatAdapter<M> for EchoAdapter {
    fn name(&self) -> &str {
        "echo"
    }

    async fn batch_text(&self, request: PromptRequest<M>) -> Result<M, AdapterError> {
        Ok(M::from(Self::reply_for(&request)))
    }

    async fn stream_text(
        &self,
        request: PromptRequest<M>,
        sender: Sender<String>,
    ) -> Result<(), AdapterError> {
        let reply = Self::reply_for(&request);
        let mut sent = 0usize;
        for word in reply.split_inclusive(' ') {
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
            sender
                .send(word.to_string())
                .await
                .map_err(|_| AdapterError::ChannelClosed)?;
            sent += 1;
        }
        debug!("Echo stream finished after {} chunks", sent);
        Ok(())
    }
}
