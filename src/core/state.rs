//! # Chat State
//!
//! The widget's aggregate state: options, the component tree and the
//! conversation. This module owns construction, mounting, painting and
//! option updates. The submission protocol itself lives in
//! [`update`](crate::core::action::update).
//!
//! ```text
//! AiChat<M>
//! ├── adapter: Arc<dyn ChatAdapter<M>>   // AI backend
//! ├── options: ChatOptions               // resolved host options
//! ├── context: ControllerContext         // cloned into every component
//! ├── root: ChatRoot                     // theme + sizing chrome
//! ├── launchpad: Launchpad               // persona welcome + starters
//! ├── segments: Vec<ChatSegment<M>>      // complete exchanges, in order
//! ├── active: Option<ChatSegment<M>>     // at most one exchange in flight
//! ├── composer: Composer                 // draft text + submit control
//! └── callbacks                          // error / message-rendered hooks
//! ```
//!
//! The active segment lives outside `segments`: it only joins the list once
//! it completes, so a failed exchange never leaves a trace there.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use log::{debug, info, warn};

use crate::adapter::{
    AdapterError, AiMessage, ChatAdapter, ChatSegmentItem, DataTransferMode, ParticipantRole,
};
use crate::core::config::{ChatOptions, DEFAULT_ASSISTANT_NAME, DEFAULT_USER_NAME};
use crate::core::error::ChatError;
use crate::ui::component::{ContextEvent, ControllerContext};
use crate::ui::components::{
    AvatarProps, ChatRoot, ChatRootProps, ChatSegment, Composer, ComposerProps, Launchpad,
    LaunchpadProps,
};
use crate::ui::dom::{Document, Element, Node};
use crate::ui::markdown::RenderExtensions;

pub type ErrorCallback = Box<dyn FnMut(&AdapterError) + Send>;
pub type RenderedCallback = Box<dyn FnMut(&str) + Send>;

pub struct AiChat<M: AiMessage> {
    pub(crate) adapter: Arc<dyn ChatAdapter<M>>,
    pub(crate) options: ChatOptions,
    context: ControllerContext,
    context_events: Receiver<ContextEvent>,
    root: ChatRoot,
    pub(crate) launchpad: Launchpad,
    pub(crate) composer: Composer,
    pub(crate) segments: Vec<ChatSegment<M>>,
    pub(crate) active: Option<ChatSegment<M>>,
    mounted_at: Option<String>,
    on_error: Option<ErrorCallback>,
    on_message_rendered: Option<RenderedCallback>,
    warned_unsanitized: bool,
}

fn user_avatar(options: &ChatOptions) -> AvatarProps {
    match &options.personas.user {
        Some(user) => AvatarProps {
            name: user.name.clone(),
            picture: user.picture.clone(),
        },
        None => AvatarProps {
            name: DEFAULT_USER_NAME.to_string(),
            picture: None,
        },
    }
}

fn assistant_avatar(options: &ChatOptions) -> AvatarProps {
    match &options.personas.assistant {
        Some(assistant) => AvatarProps {
            name: assistant.name.clone(),
            picture: assistant.picture.clone(),
        },
        None => AvatarProps {
            name: DEFAULT_ASSISTANT_NAME.to_string(),
            picture: None,
        },
    }
}

fn root_props(options: &ChatOptions) -> ChatRootProps {
    ChatRootProps {
        theme_id: options.theme_id.clone(),
        class_name: options.class_name.clone(),
        layout: options.layout.clone(),
    }
}

fn launchpad_props(options: &ChatOptions, visible: bool) -> LaunchpadProps {
    LaunchpadProps {
        persona: assistant_avatar(options),
        tagline: options
            .personas
            .assistant
            .as_ref()
            .and_then(|a| a.tagline.clone()),
        starters: options.conversation_starters.clone(),
        visible,
    }
}

impl<M: AiMessage> AiChat<M> {
    /// Empty chat with no rendering extensions.
    pub fn new(adapter: Arc<dyn ChatAdapter<M>>, options: ChatOptions) -> Self {
        Self::build(adapter, options, RenderExtensions::default())
    }

    /// Chat with rendering extensions, seeded with an exported history.
    ///
    /// The history must alternate user and AI items, starting with a user
    /// item; anything else is rejected with `InvalidInitialConversation`.
    pub fn with_history(
        adapter: Arc<dyn ChatAdapter<M>>,
        options: ChatOptions,
        extensions: RenderExtensions,
        history: Vec<ChatSegmentItem<M>>,
    ) -> Result<Self, ChatError> {
        let mut chat = Self::build(adapter, options, extensions);
        chat.seed(history)?;
        Ok(chat)
    }

    fn build(
        adapter: Arc<dyn ChatAdapter<M>>,
        options: ChatOptions,
        extensions: RenderExtensions,
    ) -> Self {
        let (context, context_events) = ControllerContext::new(extensions);
        let root = ChatRoot::new(context.clone(), root_props(&options));
        let launchpad = Launchpad::new(context.clone(), launchpad_props(&options, true));
        let composer = Composer::new(
            context.clone(),
            ComposerProps {
                text: String::new(),
                placeholder: options.composer.placeholder.clone(),
                auto_focus: options.composer.auto_focus,
                waiting: false,
                submit_shortcut: options.composer.submit_shortcut,
                disable_submit_button: options.composer.disable_submit_button,
            },
        );
        info!(
            "Chat created: adapter={}, mode={}, theme={}",
            adapter.name(),
            options.data_transfer_mode,
            options.theme_id
        );

        let mut chat = Self {
            adapter,
            options,
            context,
            context_events,
            root,
            launchpad,
            composer,
            segments: Vec::new(),
            active: None,
            mounted_at: None,
            on_error: None,
            on_message_rendered: None,
            warned_unsanitized: false,
        };
        chat.warn_if_unsanitized();
        chat
    }

    fn seed(&mut self, history: Vec<ChatSegmentItem<M>>) -> Result<(), ChatError> {
        let user_persona = user_avatar(&self.options);
        let ai_persona = assistant_avatar(&self.options);
        let mut items = history.into_iter();

        while let Some(first) = items.next() {
            if first.role() == ParticipantRole::Ai {
                return Err(ChatError::InvalidInitialConversation(format!(
                    "AI item {} has no preceding user item",
                    first.uid()
                )));
            }
            let Some(second) = items.next() else {
                return Err(ChatError::InvalidInitialConversation(format!(
                    "user item {} has no AI response",
                    first.uid()
                )));
            };
            if second.role() != ParticipantRole::Ai {
                return Err(ChatError::InvalidInitialConversation(format!(
                    "user item {} is followed by another user item",
                    first.uid()
                )));
            }
            self.segments.push(ChatSegment::restore(
                self.context.clone(),
                &first,
                &second,
                user_persona.clone(),
                ai_persona.clone(),
            ));
        }

        debug!("Seeded chat with {} segments", self.segments.len());
        self.sync_launchpad()?;
        Ok(())
    }

    fn warn_if_unsanitized(&mut self) {
        if self.context.extensions.sanitizer.is_none() && !self.warned_unsanitized {
            warn!("No HTML sanitizer configured: AI markup is rendered unsanitized");
            self.warned_unsanitized = true;
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Mode the next submission runs in: the configured one, or the other
    /// mode when the adapter only implements that. An adapter that supports
    /// neither keeps the configured mode and fails with `Unsupported`.
    pub fn transfer_mode(&self) -> DataTransferMode {
        let configured = self.options.data_transfer_mode;
        if self.adapter.supports(configured) {
            return configured;
        }
        let fallback = configured.alternate();
        if self.adapter.supports(fallback) {
            debug!(
                "Adapter '{}' lacks {} mode, using {}",
                self.adapter.name(),
                configured,
                fallback
            );
            fallback
        } else {
            configured
        }
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_text(&self) -> &str {
        self.composer.text()
    }

    /// Complete segments, oldest first.
    pub fn segments(&self) -> &[ChatSegment<M>] {
        &self.segments
    }

    pub fn active_segment(&self) -> Option<&ChatSegment<M>> {
        self.active.as_ref()
    }

    pub fn is_waiting(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted_at.is_some()
    }

    /// True iff starters are currently rendered.
    pub fn starters_visible(&self) -> bool {
        self.launchpad.is_visible() && !self.options.conversation_starters.is_empty()
    }

    /// Committed items of all complete segments, oldest first.
    pub fn conversation_history(&self) -> Result<Vec<ChatSegmentItem<M>>, ChatError> {
        let mut history = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            history.extend(segment.items()?);
        }
        Ok(history)
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Invoked once per adapter failure (not on cancellation).
    pub fn on_error(&mut self, callback: impl FnMut(&AdapterError) + Send + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Invoked with the item uid when an AI message is visually complete.
    pub fn on_message_rendered(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_message_rendered = Some(Box::new(callback));
    }

    pub(crate) fn report_error(&mut self, error: &AdapterError) {
        if let Some(callback) = self.on_error.as_mut() {
            callback(error);
        }
    }

    // ========================================================================
    // Internal bookkeeping
    // ========================================================================

    pub(crate) fn user_persona(&self) -> AvatarProps {
        user_avatar(&self.options)
    }

    pub(crate) fn assistant_persona(&self) -> AvatarProps {
        assistant_avatar(&self.options)
    }

    pub(crate) fn context(&self) -> &ControllerContext {
        &self.context
    }

    /// Shows the launchpad iff the conversation is empty and nothing is in flight.
    pub(crate) fn sync_launchpad(&mut self) -> Result<(), ChatError> {
        let visible = self.segments.is_empty() && self.active.is_none();
        self.launchpad.set_props(|p| p.visible = visible)?;
        Ok(())
    }

    /// Processes notifications queued by components during the last action.
    pub(crate) fn drain_context_events(&mut self) -> Result<(), ChatError> {
        while let Ok(event) = self.context_events.try_recv() {
            match event {
                ContextEvent::MessageRendered { uid } => {
                    debug!("Message rendered: {}", uid);
                    let mut owner = false;
                    if let Some(active) = self.active.as_mut() {
                        owner = active.item_rendered(&uid)?;
                    }
                    for segment in self.segments.iter_mut().rev() {
                        if owner {
                            break;
                        }
                        owner = segment.item_rendered(&uid)?;
                    }
                    if let Some(callback) = self.on_message_rendered.as_mut() {
                        callback(&uid);
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Mounting & painting
    // ========================================================================

    /// Composes the full widget tree from every component's subtree.
    pub fn render_tree(&self) -> Result<Element, ChatError> {
        let mut list = Element::new("div").with_class("chat-segments");
        for segment in &self.segments {
            list.append(segment.compose()?);
        }
        if let Some(active) = &self.active {
            list.append(active.compose()?);
        }

        let mut tree = self.root.dom()?.clone();
        tree.append(self.launchpad.dom()?.clone());
        tree.append(Element::new("div").with_class("chat-conversation").with_child(list));
        tree.append(self.composer.dom()?.clone());
        Ok(tree)
    }

    /// Attaches the widget to the element with `root_id` and paints it.
    pub fn mount(&mut self, document: &mut Document, root_id: &str) -> Result<(), ChatError> {
        if document.get_element_by_id(root_id).is_none() {
            return Err(ChatError::MissingRootElement(root_id.to_string()));
        }
        self.mounted_at = Some(root_id.to_string());
        info!("Chat mounted at #{}", root_id);
        self.paint(document)
    }

    /// Re-paints the mounted widget. Does nothing when not mounted.
    pub fn paint(&self, document: &mut Document) -> Result<(), ChatError> {
        let Some(root_id) = &self.mounted_at else {
            return Ok(());
        };
        let tree = self.render_tree()?;
        let target = document
            .get_element_by_id_mut(root_id)
            .ok_or_else(|| ChatError::MissingRootElement(root_id.clone()))?;
        target.replace_children(vec![Node::Element(tree)]);
        Ok(())
    }

    /// Removes the widget from the document and destroys every component.
    /// The chat cannot be used afterwards.
    pub fn unmount(&mut self, document: &mut Document) -> Result<(), ChatError> {
        if let Some(root_id) = self.mounted_at.take()
            && let Some(target) = document.get_element_by_id_mut(&root_id)
        {
            target.replace_children(vec![]);
        }
        if let Some(mut active) = self.active.take() {
            active.discard()?;
        }
        for segment in self.segments.iter_mut() {
            segment.discard()?;
        }
        self.launchpad.destroy()?;
        self.composer.destroy()?;
        self.root.destroy()?;
        info!("Chat unmounted");
        Ok(())
    }

    // ========================================================================
    // Live updates
    // ========================================================================

    /// Applies new host options. Every component only patches what changed.
    pub fn update_options(&mut self, options: ChatOptions) -> Result<(), ChatError> {
        self.root.set_props(|p| *p = root_props(&options))?;

        let visible = self.launchpad.is_visible();
        self.launchpad
            .set_props(|p| *p = launchpad_props(&options, visible))?;

        self.composer.set_props(|p| {
            p.placeholder = options.composer.placeholder.clone();
            p.auto_focus = options.composer.auto_focus;
            p.submit_shortcut = options.composer.submit_shortcut;
            p.disable_submit_button = options.composer.disable_submit_button;
        })?;

        if options.personas != self.options.personas {
            let user = user_avatar(&options);
            let ai = assistant_avatar(&options);
            for segment in self.segments.iter_mut().chain(self.active.as_mut()) {
                segment.set_personas(&user, &ai)?;
            }
        }

        if options.data_transfer_mode != self.options.data_transfer_mode {
            info!(
                "Data transfer mode changed to {} (applies to the next submission)",
                options.data_transfer_mode
            );
        }
        self.options = options;
        Ok(())
    }

    /// Replaces highlighter/sanitizer and re-renders committed AI markup.
    pub fn set_extensions(&mut self, extensions: RenderExtensions) -> Result<(), ChatError> {
        self.context.extensions = extensions.clone();
        self.root.set_extensions(extensions.clone())?;
        self.launchpad.set_extensions(extensions.clone())?;
        self.composer.set_extensions(extensions.clone())?;
        for segment in self.segments.iter_mut().chain(self.active.as_mut()) {
            segment.set_render_extensions(&extensions)?;
        }
        self.warn_if_unsanitized();
        Ok(())
    }
}

impl<M: AiMessage> fmt::Debug for AiChat<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiChat")
            .field("adapter", &self.adapter.name())
            .field("segments", &self.segments.len())
            .field("active", &self.active.as_ref().map(|s| s.uid().to_string()))
            .field("mounted_at", &self.mounted_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AssistantPersona, ConversationStarter, PersonaOptions};
    use crate::test_support::{NoopAdapter, test_chat};

    fn seeded_history() -> Vec<ChatSegmentItem<String>> {
        vec![
            ChatSegmentItem::user("Hi"),
            ChatSegmentItem::ai("Hello!".to_string(), DataTransferMode::Stream),
            ChatSegmentItem::user("Bye"),
            ChatSegmentItem::ai("See you".to_string(), DataTransferMode::Batch),
        ]
    }

    #[test]
    fn test_new_chat_defaults() {
        let chat = test_chat();
        assert!(!chat.is_waiting());
        assert!(chat.segments().is_empty());
        assert_eq!(chat.composer_text(), "");
        assert_eq!(chat.adapter_name(), "noop");
        assert!(chat.conversation_history().unwrap().is_empty());
    }

    #[test]
    fn test_mount_into_missing_root_fails() {
        let mut chat = test_chat();
        let mut doc = Document::with_mount_point("elsewhere");
        let err = chat.mount(&mut doc, "chat").unwrap_err();
        assert!(matches!(err, ChatError::MissingRootElement(ref id) if id == "chat"));
        assert!(!chat.is_mounted());
    }

    #[test]
    fn test_mount_paints_tree() {
        let mut chat = test_chat();
        let mut doc = Document::with_mount_point("chat");
        chat.mount(&mut doc, "chat").unwrap();
        let root = doc.query_class("murmur-chat-root").unwrap();
        assert!(root.has_class("murmur-theme-luna"));
        assert!(doc.query_class("composer__input").is_some());
        assert!(doc.query_class("launchpad__persona").is_some());
        assert!(doc.query_class("chat-segments").is_some());
    }

    #[test]
    fn test_seeded_history_round_trips() {
        let history = seeded_history();
        let chat = AiChat::<String>::with_history(
            Arc::new(NoopAdapter),
            ChatOptions::default(),
            RenderExtensions::default(),
            history.clone(),
        )
        .unwrap();
        assert_eq!(chat.segments().len(), 2);
        assert_eq!(chat.conversation_history().unwrap(), history);
        assert!(!chat.launchpad.is_visible());
    }

    #[test]
    fn test_orphan_ai_item_is_rejected() {
        let history = vec![ChatSegmentItem::ai("Hello!".to_string(), DataTransferMode::Stream)];
        let err = AiChat::<String>::with_history(
            Arc::new(NoopAdapter),
            ChatOptions::default(),
            RenderExtensions::default(),
            history,
        )
        .unwrap_err();
        assert!(matches!(err, ChatError::InvalidInitialConversation(_)));
    }

    #[test]
    fn test_unanswered_user_item_is_rejected() {
        let history: Vec<ChatSegmentItem<String>> =
            vec![ChatSegmentItem::user("Hi"), ChatSegmentItem::user("Anyone?")];
        let result = AiChat::<String>::with_history(
            Arc::new(NoopAdapter),
            ChatOptions::default(),
            RenderExtensions::default(),
            history,
        );
        assert!(matches!(result, Err(ChatError::InvalidInitialConversation(_))));
    }

    #[test]
    fn test_update_options_patches_theme_and_starters() {
        let mut chat = AiChat::<String>::new(
            Arc::new(NoopAdapter),
            ChatOptions {
                conversation_starters: vec![ConversationStarter::new("Hello, World!")],
                ..Default::default()
            },
        );
        let mut doc = Document::with_mount_point("chat");
        chat.mount(&mut doc, "chat").unwrap();
        assert!(chat.starters_visible());

        chat.update_options(ChatOptions {
            theme_id: "nova".to_string(),
            ..Default::default()
        })
        .unwrap();
        chat.paint(&mut doc).unwrap();

        assert!(!chat.starters_visible());
        assert!(doc.query_class("conversation-starter").is_none());
        assert!(doc.query_class("murmur-theme-nova").is_some());
        assert!(doc.query_class("murmur-theme-luna").is_none());
    }

    #[test]
    fn test_persona_update_reaches_seeded_items() {
        let mut chat = AiChat::<String>::with_history(
            Arc::new(NoopAdapter),
            ChatOptions::default(),
            RenderExtensions::default(),
            seeded_history(),
        )
        .unwrap();
        chat.update_options(ChatOptions {
            personas: PersonaOptions {
                assistant: Some(AssistantPersona {
                    name: "Harper".to_string(),
                    picture: None,
                    tagline: None,
                }),
                user: None,
            },
            ..Default::default()
        })
        .unwrap();
        let tree = chat.render_tree().unwrap();
        let ai_names: Vec<String> = tree
            .query_all_class("chat-item--ai")
            .iter()
            .filter_map(|item| item.query_class("chat-item__name"))
            .map(|el| el.text_content())
            .collect();
        assert_eq!(ai_names, vec!["Harper", "Harper"]);
    }

    #[test]
    fn test_unmount_destroys_components() {
        let mut chat = test_chat();
        let mut doc = Document::with_mount_point("chat");
        chat.mount(&mut doc, "chat").unwrap();
        chat.unmount(&mut doc).unwrap();
        assert!(doc.query_class("murmur-chat-root").is_none());
        assert!(doc.get_element_by_id("chat").is_some());
        assert!(chat.composer().is_destroyed());
        assert!(matches!(chat.render_tree(), Err(ChatError::Component(_))));
    }

    struct Brackets;

    impl crate::ui::markdown::Highlighter for Brackets {
        fn name(&self) -> &str {
            "brackets"
        }

        fn highlight(&self, code: &str, _language: &str) -> String {
            format!("[[{}]]", crate::ui::dom::escape(code.trim()))
        }
    }

    #[test]
    fn test_extension_swap_rerenders_seeded_markup() {
        let history = vec![
            ChatSegmentItem::user("Show code"),
            ChatSegmentItem::ai("```rust
let x = 1;
```".to_string(), DataTransferMode::Batch),
        ];
        let mut chat = AiChat::<String>::with_history(
            Arc::new(NoopAdapter),
            ChatOptions::default(),
            RenderExtensions::default(),
            history,
        )
        .unwrap();
        assert!(!chat.render_tree().unwrap().to_html().contains("[[let x = 1;]]"));

        chat.set_extensions(RenderExtensions {
            highlighter: Some(Arc::new(Brackets)),
            sanitizer: None,
        })
        .unwrap();
        assert!(chat.render_tree().unwrap().to_html().contains("[[let x = 1;]]"));
    }

    struct StreamOnly;

    impl ChatAdapter<String> for StreamOnly {
        fn name(&self) -> &str {
            "stream-only"
        }

        fn supports(&self, mode: DataTransferMode) -> bool {
            mode == DataTransferMode::Stream
        }
    }

    #[test]
    fn test_transfer_mode_falls_back_to_supported_mode() {
        let options = ChatOptions {
            data_transfer_mode: DataTransferMode::Batch,
            ..Default::default()
        };
        let chat = AiChat::<String>::new(Arc::new(StreamOnly), options.clone());
        assert_eq!(chat.transfer_mode(), DataTransferMode::Stream);

        // An adapter claiming both modes keeps the configured one.
        let chat = AiChat::<String>::new(Arc::new(NoopAdapter), options);
        assert_eq!(chat.transfer_mode(), DataTransferMode::Batch);
    }
}
