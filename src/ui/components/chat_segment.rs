//! # ChatSegment Component
//!
//! One exchange: the user's prompt and the AI response to it.
//!
//! ```text
//! ChatSegment
//! ├── props: uid, status, loader_visible
//! └── state
//!     ├── user: ChatItem   // committed at creation
//!     ├── ai: ChatItem     // streaming until the adapter finishes
//!     └── prompt: String   // submitted text, restored on failure
//! ```
//!
//! A segment is either active (in flight) or complete. Failed segments are
//! never marked; the chat discards them through [`ChatSegment::discard`].

use log::debug;

use crate::adapter::{AiMessage, ChatSegmentItem, DataTransferMode, ParticipantRole, new_uid};
use crate::ui::component::{Comp, CompDescriptor, CompError, CompState, ControllerContext};
use crate::ui::components::avatar::AvatarProps;
use crate::ui::components::chat_item::{ChatItem, ChatItemProps};
use crate::ui::dom::{Element, Node};
use crate::ui::markdown::RenderExtensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Active,
    Complete,
}

impl SegmentStatus {
    fn class(self) -> &'static str {
        match self {
            SegmentStatus::Active => "chat-segment--active",
            SegmentStatus::Complete => "chat-segment--complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSegmentProps {
    pub uid: String,
    pub status: SegmentStatus,
    pub loader_visible: bool,
}

pub struct SegmentState<M: AiMessage> {
    user: ChatItem<M>,
    ai: ChatItem<M>,
    prompt: String,
}

pub type ChatSegment<M> = Comp<SegmentState<M>>;

impl<M: AiMessage> CompState for SegmentState<M> {
    type Props = ChatSegmentProps;

    fn descriptor() -> CompDescriptor<Self> {
        CompDescriptor {
            name: "chatSegment",
            render: |props, _ctx| render_segment(props),
            update: |dom, before, after, _ctx| update_segment(dom, before, after),
            actions: vec![],
            listeners: vec![],
        }
    }
}

fn loader() -> Element {
    Element::new("div")
        .with_class("chat-segment__loader")
        .with_child(Element::new("span").with_class("chat-segment__spinner"))
}

fn render_segment(props: &ChatSegmentProps) -> Element {
    let mut root = Element::new("div")
        .with_class("chat-segment")
        .with_class(props.status.class())
        .with_attr("data-segment-uid", props.uid.as_str());
    if props.loader_visible {
        root.append(loader());
    }
    root
}

fn update_segment(dom: &mut Element, before: &ChatSegmentProps, after: &ChatSegmentProps) {
    if before.status != after.status {
        dom.remove_class(before.status.class());
        dom.add_class(after.status.class());
    }
    if before.loader_visible != after.loader_visible {
        dom.children
            .retain(|node| !matches!(node, Node::Element(el) if el.has_class("chat-segment__loader")));
        if after.loader_visible {
            dom.append(loader());
        }
    }
}

impl<M: AiMessage> ChatSegment<M> {
    /// Starts an exchange: the user item is committed with `prompt`, the AI
    /// item starts streaming with no content.
    pub fn start(
        context: ControllerContext,
        prompt: &str,
        user_persona: AvatarProps,
        ai_persona: AvatarProps,
        data_transfer_mode: DataTransferMode,
    ) -> Self {
        let user = ChatItem::new(
            context.clone(),
            ChatItemProps {
                uid: new_uid(),
                role: ParticipantRole::User,
                data_transfer_mode,
                persona: user_persona,
                message: Some(prompt.to_string()),
            },
        );
        let ai = ChatItem::new(
            context.clone(),
            ChatItemProps {
                uid: new_uid(),
                role: ParticipantRole::Ai,
                data_transfer_mode,
                persona: ai_persona,
                message: None,
            },
        );
        let props = ChatSegmentProps {
            uid: new_uid(),
            status: SegmentStatus::Active,
            loader_visible: true,
        };
        let state = SegmentState {
            user,
            ai,
            prompt: prompt.to_string(),
        };
        Comp::create(context, props, state)
    }

    /// Rebuilds a complete segment from a committed user/AI snapshot pair.
    pub fn restore(
        context: ControllerContext,
        user_item: &ChatSegmentItem<M>,
        ai_item: &ChatSegmentItem<M>,
        user_persona: AvatarProps,
        ai_persona: AvatarProps,
    ) -> Self {
        let user = ChatItem::from_segment_item(context.clone(), user_item, user_persona);
        let ai = ChatItem::from_segment_item(context.clone(), ai_item, ai_persona);
        let props = ChatSegmentProps {
            uid: new_uid(),
            status: SegmentStatus::Complete,
            loader_visible: false,
        };
        let state = SegmentState {
            user,
            ai,
            prompt: user_item.text(),
        };
        Comp::create(context, props, state)
    }

    pub fn uid(&self) -> &str {
        &self.props().uid
    }

    pub fn status(&self) -> SegmentStatus {
        self.props().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == SegmentStatus::Active
    }

    pub fn loader_visible(&self) -> bool {
        self.props().loader_visible
    }

    /// The text that was submitted for this exchange.
    pub fn prompt(&self) -> &str {
        &self.state.prompt
    }

    pub fn user_item(&self) -> &ChatItem<M> {
        &self.state.user
    }

    pub fn ai_item(&self) -> &ChatItem<M> {
        &self.state.ai
    }

    /// Routes one streamed chunk to the AI item and hides the loader.
    pub fn add_chunk(&mut self, chunk: &str) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.state.ai.add_chunk(chunk)?;
        self.set_props(|p| p.loader_visible = false)?;
        Ok(())
    }

    /// Stream finished: commits the AI item and marks the segment complete.
    pub fn complete_stream(&mut self) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.state.ai.commit_chunks()?;
        self.set_props(|p| p.status = SegmentStatus::Complete)?;
        Ok(())
    }

    /// Batch response arrived: stores it on the AI item and marks the segment complete.
    pub fn complete_batch(&mut self, message: M) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.state.ai.set_ai_message(message)?;
        self.set_props(|p| p.status = SegmentStatus::Complete)?;
        Ok(())
    }

    /// Called when a chat item reported visual completion. Returns whether the
    /// item belongs to this segment.
    pub fn item_rendered(&mut self, item_uid: &str) -> Result<bool, CompError> {
        if self.state.ai.uid() != item_uid {
            return Ok(false);
        }
        self.set_props(|p| p.loader_visible = false)?;
        Ok(true)
    }

    pub fn set_personas(&mut self, user: &AvatarProps, ai: &AvatarProps) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.state.user.set_persona(user.clone())?;
        self.state.ai.set_persona(ai.clone())?;
        Ok(())
    }

    /// Swaps highlighter/sanitizer on the segment and its items, then
    /// re-renders committed AI markup with them.
    pub fn set_render_extensions(&mut self, extensions: &RenderExtensions) -> Result<(), CompError> {
        self.set_extensions(extensions.clone())?;
        self.state.user.set_extensions(extensions.clone())?;
        self.state.ai.set_extensions(extensions.clone())?;
        self.state.ai.refresh_markup()
    }

    /// Snapshots of both items, user first.
    pub fn items(&self) -> Result<Vec<ChatSegmentItem<M>>, CompError> {
        self.ensure_alive()?;
        Ok(vec![
            self.state.user.get_segment_item()?,
            self.state.ai.get_segment_item()?,
        ])
    }

    /// Composes the segment subtree with both items for painting.
    pub fn compose(&self) -> Result<Element, CompError> {
        let mut tree = self.dom()?.clone();
        let own = std::mem::take(&mut tree.children);
        tree.append(self.state.user.dom()?.clone());
        tree.append(self.state.ai.dom()?.clone());
        tree.children.extend(own);
        Ok(tree)
    }

    /// Destroys both items and the segment itself.
    pub fn discard(&mut self) -> Result<(), CompError> {
        self.ensure_alive()?;
        debug!("Discarding segment {}", self.uid());
        self.state.ai.destroy()?;
        self.state.user.destroy()?;
        self.destroy()
    }
}
