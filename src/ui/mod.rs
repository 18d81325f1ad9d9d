//! # Widget Layer
//!
//! The component runtime, the widget components and the host run-loop.
//!
//! [`ChatHost`] is the piece that connects a chat to the outside world: it
//! translates [`HostEvent`]s into core actions, runs the adapter calls the
//! reducer asks for on tokio tasks and re-paints the document after every
//! dispatched action.
//!
//! ## Task Strategy
//!
//! Each submission runs on one spawned task. In stream mode the adapter
//! future and the chunk forwarder are joined inside that task, so every
//! `ResponseChunk` is queued before the terminal `StreamComplete` or
//! `ResponseFailed`. Cancelling aborts the task; anything it already queued
//! is dropped by the reducer as stale.

pub mod component;
pub mod components;
pub mod dom;
pub mod event;
pub mod markdown;

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

use crate::adapter::{AdapterError, AiMessage, DataTransferMode, PromptRequest};
use crate::core::action::{Action, Effect, update};
use crate::core::error::ChatError;
use crate::core::state::AiChat;
use crate::ui::component::EventHandler;
use crate::ui::components::ComposerEvent;
use crate::ui::dom::Document;
use crate::ui::event::HostEvent;

/// Capacity of the per-request chunk channel handed to adapters.
const CHUNK_BUFFER: usize = 100;

/// Owns a mounted chat and drives it.
#[derive(Debug)]
pub struct ChatHost<M: AiMessage> {
    chat: AiChat<M>,
    document: Document,
    tx: UnboundedSender<Action<M>>,
    rx: UnboundedReceiver<Action<M>>,
    // Abort handles for the in-flight request (used by cancel)
    active_abort_handles: Vec<AbortHandle>,
    halted: Option<AdapterError>,
}

impl<M: AiMessage> ChatHost<M> {
    /// Mounts `chat` at `root_id` inside `document`.
    pub fn new(mut chat: AiChat<M>, mut document: Document, root_id: &str) -> Result<Self, ChatError> {
        chat.mount(&mut document, root_id)?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            chat,
            document,
            tx,
            rx,
            active_abort_handles: Vec::new(),
            halted: None,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn chat(&self) -> &AiChat<M> {
        &self.chat
    }

    /// Direct access for live option or extension updates. Call
    /// [`ChatHost::repaint`] afterwards.
    pub fn chat_mut(&mut self) -> &mut AiChat<M> {
        &mut self.chat
    }

    /// The error that halted the host under the fatal policy, if any.
    pub fn halted_by(&self) -> Option<&AdapterError> {
        self.halted.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn repaint(&mut self) -> Result<(), ChatError> {
        self.chat.paint(&mut self.document)
    }

    /// Routes one piece of host input.
    pub fn handle_event(&mut self, event: &HostEvent) -> Result<(), ChatError> {
        if self.halted.is_some() {
            debug!("Host halted, ignoring {:?}", event);
            return Ok(());
        }
        let action = match event {
            HostEvent::Escape => Some(Action::Cancel),
            HostEvent::StarterClicked(index) => Some(Action::SelectStarter(*index)),
            _ => match self.chat.composer.handle_event(event)? {
                Some(ComposerEvent::Submit(text)) => Some(Action::Submit(text)),
                // Composer already holds the new text.
                Some(ComposerEvent::ContentChanged) | None => None,
            },
        };
        match action {
            Some(action) => self.dispatch(action),
            None => self.repaint(),
        }
    }

    /// Applies an action and performs the resulting effect.
    pub fn dispatch(&mut self, action: Action<M>) -> Result<(), ChatError> {
        match update(&mut self.chat, action)? {
            Effect::None => {}
            Effect::SpawnRequest(request) => {
                self.abort_active();
                self.active_abort_handles.push(self.spawn_request(request));
            }
            Effect::AbortRequest => self.abort_active(),
            Effect::Halt(err) => {
                error!("Halting chat after adapter error: {}", err);
                self.abort_active();
                self.halted = Some(err);
            }
        }
        self.repaint()
    }

    /// Waits for the next action from a background task and dispatches it.
    pub async fn step(&mut self) -> Result<(), ChatError> {
        let action = self.next_action().await;
        self.dispatch(action)
    }

    /// Next action queued by a background task. Cancel-safe, so it can be
    /// raced against host input in `tokio::select!`.
    pub async fn next_action(&mut self) -> Action<M> {
        match self.rx.recv().await {
            Some(action) => action,
            // Unreachable: the host keeps a sender alive.
            None => std::future::pending().await,
        }
    }

    /// Dispatches queued actions until no segment is in flight.
    pub async fn settle(&mut self) -> Result<(), ChatError> {
        while self.chat.is_waiting() && self.halted.is_none() {
            self.step().await?;
        }
        Ok(())
    }

    /// Aborts outstanding requests and unmounts the widget.
    pub fn shutdown(&mut self) -> Result<(), ChatError> {
        self.abort_active();
        self.chat.unmount(&mut self.document)?;
        info!("Host shut down");
        Ok(())
    }

    fn abort_active(&mut self) {
        for handle in self.active_abort_handles.drain(..) {
            handle.abort();
        }
    }

    fn spawn_request(&self, request: PromptRequest<M>) -> AbortHandle {
        let adapter = Arc::clone(&self.chat.adapter);
        let mode = self.chat.transfer_mode();
        let tx = self.tx.clone();
        let segment_uid = request.segment_uid.clone();
        info!(
            "Spawning {} request to adapter '{}' for segment {}",
            mode,
            adapter.name(),
            segment_uid
        );

        let handle = tokio::spawn(async move {
            let outcome = match mode {
                DataTransferMode::Stream => {
                    let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(CHUNK_BUFFER);
                    let forward = async {
                        let mut forwarded = 0usize;
                        while let Some(text) = chunk_rx.recv().await {
                            forwarded += 1;
                            let chunk = Action::ResponseChunk {
                                segment_uid: segment_uid.clone(),
                                text,
                            };
                            if tx.send(chunk).is_err() {
                                warn!("Failed to forward ResponseChunk: receiver dropped");
                                break;
                            }
                        }
                        forwarded
                    };
                    let (result, forwarded) =
                        futures::future::join(adapter.stream_text(request, chunk_tx), forward)
                            .await;
                    debug!("Stream for segment {} forwarded {} chunks", segment_uid, forwarded);
                    match result {
                        Ok(()) => Action::StreamComplete {
                            segment_uid: segment_uid.clone(),
                        },
                        Err(error) => Action::ResponseFailed {
                            segment_uid: segment_uid.clone(),
                            error,
                        },
                    }
                }
                DataTransferMode::Batch => match adapter.batch_text(request).await {
                    Ok(message) => Action::ResponseReady {
                        segment_uid: segment_uid.clone(),
                        message,
                    },
                    Err(error) => Action::ResponseFailed {
                        segment_uid: segment_uid.clone(),
                        error,
                    },
                },
            };
            if tx.send(outcome).is_err() {
                warn!("Failed to send result for segment {}: receiver dropped", segment_uid);
            }
        });
        handle.abort_handle()
    }
}
