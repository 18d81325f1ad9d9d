//! # ChatItem Component
//!
//! One message (user or AI) inside a chat segment.
//!
//! ## State machine
//!
//! ```text
//!   new(message: None) ──► Streaming ──commit_chunks()──► Committed
//!   new(message: Some) ─────────────────────────────────► Committed
//! ```
//!
//! One-directional. While streaming, each chunk is appended to the content
//! element as a new text node so earlier content is never re-rendered. On
//! commit the full text is rendered once as markdown; the render target then
//! raises `markdown-stream-complete`, which the item forwards to the chat as
//! [`ContextEvent::MessageRendered`] (exactly once).
//!
//! The AI payload type `M` is opaque: the item stores it and hands it back.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::adapter::{AiMessage, ChatSegmentItem, DataTransferMode, MessageStatus, ParticipantRole};
use crate::ui::component::{
    ActionArg, Comp, CompDescriptor, CompError, CompState, ContextEvent, ControllerContext,
    DomAction, DomEvent, Listener,
};
use crate::ui::components::avatar::{AvatarProps, render_avatar, update_avatar};
use crate::ui::dom::{Element, Node};
use crate::ui::markdown;

const PROCESS_STREAMED_CHUNK: &str = "process-streamed-chunk";
const COMMIT_CONTENT: &str = "commit-content";
const REFRESH_MARKUP: &str = "refresh-markup";
const RENDER_COMPLETE: &str = "markdown-stream-complete";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatItemProps {
    pub uid: String,
    pub role: ParticipantRole,
    pub data_transfer_mode: DataTransferMode,
    pub persona: AvatarProps,
    /// Complete initial content. When present the item starts committed.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    Streaming,
    Committed,
}

pub struct ChatItemState<M> {
    phase: ItemPhase,
    content: String,
    ai_message: Option<M>,
    committed_at: Option<DateTime<Utc>>,
    rendered: bool,
}

pub type ChatItem<M> = Comp<ChatItemState<M>>;

impl<M: AiMessage> CompState for ChatItemState<M> {
    type Props = ChatItemProps;

    fn descriptor() -> CompDescriptor<Self> {
        CompDescriptor {
            name: "chatItem",
            render: render_chat_item,
            update: update_chat_item,
            actions: vec![
                (PROCESS_STREAMED_CHUNK, process_streamed_chunk as DomAction),
                (COMMIT_CONTENT, commit_content as DomAction),
                (REFRESH_MARKUP, refresh_markup as DomAction),
            ],
            listeners: vec![(RENDER_COMPLETE, on_render_complete::<M> as Listener<Self>)],
        }
    }
}

// ============================================================================
// Render / update
// ============================================================================

fn render_chat_item(props: &ChatItemProps, ctx: &ControllerContext) -> Element {
    let mut content = Element::new("div").with_class("chat-item__content");
    if let Some(message) = &props.message {
        match props.role {
            ParticipantRole::Ai => content
                .children
                .push(Node::Markup(markdown::render(message, &ctx.extensions))),
            ParticipantRole::User => content.append_text(message.as_str()),
        }
    }

    let participant = Element::new("div")
        .with_class("chat-item__participant")
        .with_child(render_avatar(&props.persona))
        .with_child(
            Element::new("span")
                .with_class("chat-item__name")
                .with_text(props.persona.name.as_str()),
        );

    let mut root = Element::new("div")
        .with_class("chat-item")
        .with_class(&format!("chat-item--{}", props.role.label()))
        .with_attr("data-uid", props.uid.as_str())
        .with_child(participant)
        .with_child(content);
    root.add_class(if props.message.is_some() {
        "chat-item--committed"
    } else {
        "chat-item--streaming"
    });
    root
}

fn update_chat_item(
    dom: &mut Element,
    before: &ChatItemProps,
    after: &ChatItemProps,
    _ctx: &ControllerContext,
) {
    if before.persona == after.persona {
        return;
    }
    if let Some(avatar) = dom.query_class_mut("avatar") {
        update_avatar(avatar, &before.persona, &after.persona);
    }
    if before.persona.name != after.persona.name
        && let Some(name) = dom.query_class_mut("chat-item__name")
    {
        name.replace_children(vec![Node::Text(after.persona.name.clone())]);
    }
}

// ============================================================================
// DOM actions & listeners
// ============================================================================

fn process_streamed_chunk(dom: &mut Element, arg: &ActionArg, _ctx: &ControllerContext) -> Vec<DomEvent> {
    dom.add_class("chat-item--streaming");
    if let Some(content) = dom.query_class_mut("chat-item__content") {
        content.append_text(arg.text());
    }
    vec![]
}

fn commit_content(dom: &mut Element, arg: &ActionArg, ctx: &ControllerContext) -> Vec<DomEvent> {
    dom.remove_class("chat-item--streaming");
    dom.add_class("chat-item--committed");
    if let Some(content) = dom.query_class_mut("chat-item__content") {
        let markup = markdown::render(arg.text(), &ctx.extensions);
        content.replace_children(vec![Node::Markup(markup)]);
    }
    vec![DomEvent::new(RENDER_COMPLETE, ActionArg::None)]
}

fn refresh_markup(dom: &mut Element, arg: &ActionArg, ctx: &ControllerContext) -> Vec<DomEvent> {
    if let Some(content) = dom.query_class_mut("chat-item__content") {
        let markup = markdown::render(arg.text(), &ctx.extensions);
        content.replace_children(vec![Node::Markup(markup)]);
    }
    vec![]
}

fn on_render_complete<M>(
    state: &mut ChatItemState<M>,
    props: &ChatItemProps,
    ctx: &ControllerContext,
    _arg: &ActionArg,
) {
    if state.rendered {
        return;
    }
    state.rendered = true;
    ctx.emit(ContextEvent::MessageRendered {
        uid: props.uid.clone(),
    });
}

// ============================================================================
// Public API
// ============================================================================

impl<M: AiMessage> ChatItem<M> {
    /// Creates an item. With `props.message` set the item is committed
    /// immediately, otherwise it starts streaming with an empty buffer.
    pub fn new(context: ControllerContext, props: ChatItemProps) -> Self {
        let state = match &props.message {
            Some(message) => ChatItemState {
                phase: ItemPhase::Committed,
                content: message.clone(),
                ai_message: None,
                committed_at: Some(Utc::now()),
                rendered: false,
            },
            None => ChatItemState {
                phase: ItemPhase::Streaming,
                content: String::new(),
                ai_message: None,
                committed_at: None,
                rendered: false,
            },
        };
        Comp::create(context, props, state)
    }

    /// Rebuilds a committed item from an exported snapshot.
    pub fn from_segment_item(
        context: ControllerContext,
        item: &ChatSegmentItem<M>,
        persona: AvatarProps,
    ) -> Self {
        let (data_transfer_mode, ai_message) = match item {
            ChatSegmentItem::Ai {
                content,
                data_transfer_mode,
                ..
            } => (*data_transfer_mode, Some(content.clone())),
            ChatSegmentItem::User { .. } => (DataTransferMode::default(), None),
        };
        let props = ChatItemProps {
            uid: item.uid().to_string(),
            role: item.role(),
            data_transfer_mode,
            persona,
            message: Some(item.text()),
        };
        let mut comp = Self::new(context, props);
        comp.state.ai_message = ai_message;
        comp.state.committed_at = Some(item.timestamp());
        comp
    }

    pub fn uid(&self) -> &str {
        &self.props().uid
    }

    pub fn role(&self) -> ParticipantRole {
        self.props().role
    }

    pub fn is_streaming(&self) -> bool {
        self.state.phase == ItemPhase::Streaming
    }

    /// True once the render target reported the final markup as flushed.
    pub fn is_rendered(&self) -> bool {
        self.state.rendered
    }

    /// Accumulated text content.
    pub fn text(&self) -> &str {
        &self.state.content
    }

    /// The typed AI payload, if the item received one.
    pub fn ai_message(&self) -> Option<&M> {
        self.state.ai_message.as_ref()
    }

    /// Appends one streamed chunk.
    pub fn add_chunk(&mut self, chunk: &str) -> Result<(), CompError> {
        self.ensure_alive()?;
        if self.state.phase == ItemPhase::Committed {
            warn!("Chunk for committed chat item {} rejected", self.uid());
            return Err(CompError::AlreadyCommitted {
                uid: self.uid().to_string(),
            });
        }
        self.execute_action(PROCESS_STREAMED_CHUNK, ActionArg::Text(chunk.to_string()))?;
        self.state.content.push_str(chunk);
        self.state.phase = ItemPhase::Streaming;
        Ok(())
    }

    /// Finalises the content. Committing twice is a no-op.
    pub fn commit_chunks(&mut self) -> Result<(), CompError> {
        self.ensure_alive()?;
        if self.state.phase == ItemPhase::Committed {
            debug!("Chat item {} already committed", self.uid());
            return Ok(());
        }
        self.state.phase = ItemPhase::Committed;
        self.state.committed_at = Some(Utc::now());
        let content = self.state.content.clone();
        self.execute_action(COMMIT_CONTENT, ActionArg::Text(content))
    }

    /// Stores a complete (batch) response and commits it.
    pub fn set_ai_message(&mut self, message: M) -> Result<(), CompError> {
        self.ensure_alive()?;
        if self.state.phase == ItemPhase::Committed {
            return Err(CompError::AlreadyCommitted {
                uid: self.uid().to_string(),
            });
        }
        self.state.content = message.display_text();
        self.state.ai_message = Some(message);
        self.commit_chunks()
    }

    /// Updates the persona shown next to the message.
    pub fn set_persona(&mut self, persona: AvatarProps) -> Result<bool, CompError> {
        self.set_props(|p| p.persona = persona)
    }

    /// Re-renders committed AI markup, e.g. after the highlighter changed.
    pub fn refresh_markup(&mut self) -> Result<(), CompError> {
        self.ensure_alive()?;
        if self.is_streaming() || self.role() == ParticipantRole::User {
            return Ok(());
        }
        let content = self.state.content.clone();
        self.execute_action(REFRESH_MARKUP, ActionArg::Text(content))
    }

    /// Immutable snapshot of a committed item.
    pub fn get_segment_item(&self) -> Result<ChatSegmentItem<M>, CompError> {
        self.ensure_alive()?;
        if self.is_streaming() {
            return Err(CompError::StillStreaming {
                uid: self.uid().to_string(),
            });
        }
        let uid = self.uid().to_string();
        let timestamp = self.state.committed_at.unwrap_or_else(Utc::now);
        Ok(match self.role() {
            ParticipantRole::Ai => ChatSegmentItem::Ai {
                uid,
                content: self
                    .state
                    .ai_message
                    .clone()
                    .unwrap_or_else(|| M::from(self.state.content.clone())),
                status: MessageStatus::Complete,
                data_transfer_mode: self.props().data_transfer_mode,
                timestamp,
            },
            ParticipantRole::User => ChatSegmentItem::User {
                uid,
                content: self.state.content.clone(),
                status: MessageStatus::Complete,
                timestamp,
            },
        })
    }
}
