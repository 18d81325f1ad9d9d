//! # Base component model
//!
//! Every widget part (chat item, segment, composer, avatar, ...) is a
//! [`Comp<S>`]: one generic lifecycle container parameterised by a
//! variant-state type `S`. The variant supplies a [`CompDescriptor`]: its
//! name, a render function (structure), an update function (diff-applying
//! mutation), a table of named DOM actions, and the DOM event names it
//! listens to. No reflection, no inheritance chains: one descriptor, one
//! generic constructor.
//!
//! ```text
//! Comp<S>
//! ├── props: S::Props          // immutable snapshot, replaced on update
//! ├── dom: Option<Element>     // owned subtree, None once destroyed
//! ├── actions: name → fn       // DOM patches, may raise DomEvents
//! ├── listeners: event → fn    // reacts to DomEvents, may emit to context
//! └── state: S                 // variant data (buffers, flags)
//! ```
//!
//! Every operation on a destroyed component fails with
//! [`CompError::Destroyed`] and leaves all retained state untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;

use log::debug;

use crate::ui::dom::Element;
use crate::ui::event::HostEvent;
use crate::ui::markdown::RenderExtensions;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompError {
    /// Operation attempted after `destroy()`.
    Destroyed { component: &'static str },
    /// Action name not registered in the component's descriptor.
    UnknownAction { component: &'static str, action: String },
    /// Mutation attempted on a chat item whose content is final.
    AlreadyCommitted { uid: String },
    /// Snapshot requested for a chat item that is still streaming.
    StillStreaming { uid: String },
}

impl fmt::Display for CompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompError::Destroyed { component } => {
                write!(f, "component '{component}' has already been destroyed")
            }
            CompError::UnknownAction { component, action } => {
                write!(f, "component '{component}' has no action named '{action}'")
            }
            CompError::AlreadyCommitted { uid } => {
                write!(f, "chat item {uid} is committed and can no longer change")
            }
            CompError::StillStreaming { uid } => {
                write!(f, "chat item {uid} is still streaming")
            }
        }
    }
}

impl std::error::Error for CompError {}

// ============================================================================
// Context
// ============================================================================

/// Notifications a component sends to the chat that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// A chat item's markup has been fully flushed to its render target.
    MessageRendered { uid: String },
}

/// Non-owning route from a component back to its chat.
///
/// Cloned into every component at construction. It carries the shared
/// rendering extensions and a queue the chat drains after each action; it is
/// used only for event dispatch, never for lifecycle control.
#[derive(Debug, Clone)]
pub struct ControllerContext {
    events: mpsc::Sender<ContextEvent>,
    pub extensions: RenderExtensions,
}

impl ControllerContext {
    pub fn new(extensions: RenderExtensions) -> (Self, mpsc::Receiver<ContextEvent>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                events: tx,
                extensions,
            },
            rx,
        )
    }

    pub fn emit(&self, event: ContextEvent) {
        if self.events.send(event).is_err() {
            debug!("Context event dropped: chat no longer listening");
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Argument passed to actions and carried by DOM events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActionArg {
    #[default]
    None,
    Text(String),
    Flag(bool),
}

impl ActionArg {
    pub fn text(&self) -> &str {
        match self {
            ActionArg::Text(t) => t,
            _ => "",
        }
    }
}

/// Event raised by a DOM action (the render target talking back).
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub name: &'static str,
    pub arg: ActionArg,
}

impl DomEvent {
    pub fn new(name: &'static str, arg: ActionArg) -> Self {
        Self { name, arg }
    }
}

pub type RenderFn<P> = fn(&P, &ControllerContext) -> Element;
pub type UpdateFn<P> = fn(&mut Element, &P, &P, &ControllerContext);
pub type DomAction = fn(&mut Element, &ActionArg, &ControllerContext) -> Vec<DomEvent>;
pub type Listener<S> =
    fn(&mut S, &<S as CompState>::Props, &ControllerContext, &ActionArg);

/// Capability descriptor of one component variant.
pub struct CompDescriptor<S: CompState> {
    pub name: &'static str,
    pub render: RenderFn<S::Props>,
    pub update: UpdateFn<S::Props>,
    pub actions: Vec<(&'static str, DomAction)>,
    pub listeners: Vec<(&'static str, Listener<S>)>,
}

/// Implemented by each component variant's state type.
pub trait CompState: Sized {
    type Props: Clone + PartialEq + fmt::Debug;

    fn descriptor() -> CompDescriptor<Self>;
}

// ============================================================================
// Comp
// ============================================================================

pub struct Comp<S: CompState> {
    name: &'static str,
    context: ControllerContext,
    props: S::Props,
    dom: Option<Element>,
    update: UpdateFn<S::Props>,
    actions: HashMap<&'static str, DomAction>,
    listeners: HashMap<&'static str, Listener<S>>,
    pub(crate) state: S,
    dom_patches: usize,
}

impl<S: CompState> Comp<S> {
    /// Builds the component and renders its initial subtree once.
    pub fn create(context: ControllerContext, props: S::Props, state: S) -> Self {
        let descriptor = S::descriptor();
        let dom = (descriptor.render)(&props, &context);
        debug!("Created component '{}'", descriptor.name);
        Self {
            name: descriptor.name,
            context,
            props,
            dom: Some(dom),
            update: descriptor.update,
            actions: descriptor.actions.into_iter().collect(),
            listeners: descriptor.listeners.into_iter().collect(),
            state,
            dom_patches: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn props(&self) -> &S::Props {
        &self.props
    }

    pub fn context(&self) -> &ControllerContext {
        &self.context
    }

    pub fn is_destroyed(&self) -> bool {
        self.dom.is_none()
    }

    /// Number of DOM patches applied so far (updates + actions).
    pub fn dom_patches(&self) -> usize {
        self.dom_patches
    }

    pub fn dom(&self) -> Result<&Element, CompError> {
        self.dom.as_ref().ok_or(CompError::Destroyed {
            component: self.name,
        })
    }

    pub(crate) fn ensure_alive(&self) -> Result<(), CompError> {
        self.dom().map(|_| ())
    }

    /// Runs the named DOM action against the owned subtree, then dispatches
    /// any events the action raised to this component's listeners.
    pub fn execute_action(&mut self, name: &str, arg: ActionArg) -> Result<(), CompError> {
        let component = self.name;
        let dom = self.dom.as_mut().ok_or(CompError::Destroyed { component })?;
        let action = *self.actions.get(name).ok_or_else(|| CompError::UnknownAction {
            component,
            action: name.to_string(),
        })?;

        let raised = action(dom, &arg, &self.context);
        self.dom_patches += 1;

        for event in raised {
            self.dispatch(&event);
        }
        Ok(())
    }

    /// Applies `patch` to a copy of the props. When the result differs, the
    /// snapshot is replaced and the update function patches the DOM with the
    /// before/after pair. Returns whether anything changed.
    pub fn set_props(&mut self, patch: impl FnOnce(&mut S::Props)) -> Result<bool, CompError> {
        let component = self.name;
        let dom = self.dom.as_mut().ok_or(CompError::Destroyed { component })?;

        let mut next = self.props.clone();
        patch(&mut next);
        if next == self.props {
            return Ok(false);
        }

        (self.update)(dom, &self.props, &next, &self.context);
        self.props = next;
        self.dom_patches += 1;
        Ok(true)
    }

    /// Delivers a render-target event to the registered listener. Events with
    /// no listener are ignored.
    pub fn emit(&mut self, name: &'static str, arg: ActionArg) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.dispatch(&DomEvent::new(name, arg));
        Ok(())
    }

    fn dispatch(&mut self, event: &DomEvent) {
        match self.listeners.get(event.name) {
            Some(listener) => listener(&mut self.state, &self.props, &self.context, &event.arg),
            None => debug!("Component '{}' ignores event '{}'", self.name, event.name),
        }
    }

    /// Replaces the shared rendering extensions (highlighter, sanitizer).
    pub fn set_extensions(&mut self, extensions: RenderExtensions) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.context.extensions = extensions;
        Ok(())
    }

    /// Unmounts the subtree and releases listeners. Fails if already destroyed.
    pub fn destroy(&mut self) -> Result<(), CompError> {
        self.ensure_alive()?;
        self.dom = None;
        self.listeners.clear();
        self.actions.clear();
        debug!("Destroyed component '{}'", self.name);
        Ok(())
    }
}

impl<S: CompState> fmt::Debug for Comp<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comp")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Translates raw host input into component-level events.
pub trait EventHandler {
    type Event;

    /// Returns `Some(event)` when the input produced something the owner
    /// must act on.
    fn handle_event(&mut self, event: &HostEvent) -> Result<Option<Self::Event>, CompError>;
}
