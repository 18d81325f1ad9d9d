//! # Composer Component
//!
//! Draft text plus the submit control.
//!
//! ## Responsibilities
//!
//! - Hold the draft text (typing, paste, deletion arrive as whole-text input)
//! - Apply the submit shortcut (Enter or Ctrl/Cmd+Enter)
//! - Enable the submit control only when a submission would be accepted
//!
//! ## State Management
//!
//! The draft is a prop so that clearing (on success) and restoring (on
//! failure) go through the same diffing update as everything else. `waiting`
//! is driven by the chat while a segment is active.

use crate::core::config::SubmitShortcut;
use crate::ui::component::{
    Comp, CompDescriptor, CompError, CompState, ControllerContext, EventHandler,
};
use crate::ui::dom::{Element, Node};
use crate::ui::event::HostEvent;

/// High-level events emitted by the composer.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerEvent {
    /// Submission requested with this text.
    Submit(String),
    /// Draft text changed.
    ContentChanged,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComposerProps {
    pub text: String,
    pub placeholder: Option<String>,
    pub auto_focus: bool,
    /// A segment is in flight.
    pub waiting: bool,
    pub submit_shortcut: SubmitShortcut,
    pub disable_submit_button: bool,
}

impl ComposerProps {
    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty() && !self.waiting && !self.disable_submit_button
    }
}

pub struct ComposerState;

pub type Composer = Comp<ComposerState>;

impl CompState for ComposerState {
    type Props = ComposerProps;

    fn descriptor() -> CompDescriptor<Self> {
        CompDescriptor {
            name: "composer",
            render: |props, _ctx| render_composer(props),
            update: |dom, before, after, _ctx| update_composer(dom, before, after),
            actions: vec![],
            listeners: vec![],
        }
    }
}

fn render_composer(props: &ComposerProps) -> Element {
    let mut input = Element::new("textarea")
        .with_class("composer__input")
        .with_text(props.text.as_str());
    if let Some(placeholder) = &props.placeholder {
        input.set_attr("placeholder", placeholder.as_str());
    }
    if props.auto_focus {
        input.set_attr("autofocus", "");
    }

    let mut submit = Element::new("button")
        .with_class("composer__submit")
        .with_text("Send");
    if !props.can_submit() {
        submit.set_attr("disabled", "");
    }

    let mut root = Element::new("div")
        .with_class("composer")
        .with_child(input)
        .with_child(submit);
    root.toggle_class("composer--waiting", props.waiting);
    root
}

fn update_composer(dom: &mut Element, before: &ComposerProps, after: &ComposerProps) {
    if let Some(input) = dom.query_class_mut("composer__input") {
        if before.text != after.text {
            input.replace_children(vec![Node::Text(after.text.clone())]);
        }
        if before.placeholder != after.placeholder {
            match &after.placeholder {
                Some(placeholder) => input.set_attr("placeholder", placeholder.as_str()),
                None => input.remove_attr("placeholder"),
            }
        }
        if before.auto_focus != after.auto_focus {
            if after.auto_focus {
                input.set_attr("autofocus", "");
            } else {
                input.remove_attr("autofocus");
            }
        }
    }

    if before.can_submit() != after.can_submit()
        && let Some(submit) = dom.query_class_mut("composer__submit")
    {
        if after.can_submit() {
            submit.remove_attr("disabled");
        } else {
            submit.set_attr("disabled", "");
        }
    }

    if before.waiting != after.waiting {
        dom.toggle_class("composer--waiting", after.waiting);
    }
}

impl Composer {
    pub fn new(context: ControllerContext, props: ComposerProps) -> Self {
        Comp::create(context, props, ComposerState)
    }

    pub fn text(&self) -> &str {
        &self.props().text
    }

    pub fn can_submit(&self) -> bool {
        self.props().can_submit()
    }

    pub fn set_text(&mut self, text: &str) -> Result<bool, CompError> {
        self.set_props(|p| p.text = text.to_string())
    }

    pub fn set_waiting(&mut self, waiting: bool) -> Result<bool, CompError> {
        self.set_props(|p| p.waiting = waiting)
    }

    fn submission(&self) -> Option<ComposerEvent> {
        self.can_submit()
            .then(|| ComposerEvent::Submit(self.text().to_string()))
    }
}

impl EventHandler for Composer {
    type Event = ComposerEvent;

    fn handle_event(&mut self, event: &HostEvent) -> Result<Option<Self::Event>, CompError> {
        self.ensure_alive()?;
        Ok(match event {
            HostEvent::Input(text) => self
                .set_text(text)?
                .then_some(ComposerEvent::ContentChanged),
            HostEvent::Enter(modifiers) => {
                let submits = match self.props().submit_shortcut {
                    SubmitShortcut::Enter => !modifiers.any(),
                    SubmitShortcut::CommandEnter => modifiers.command(),
                };
                if submits {
                    self.submission()
                } else {
                    let text = format!("{}\n", self.text());
                    self.set_text(&text)?;
                    Some(ComposerEvent::ContentChanged)
                }
            }
            HostEvent::SubmitClicked => self.submission(),
            HostEvent::StarterClicked(_) | HostEvent::Escape => None,
        })
    }
}
