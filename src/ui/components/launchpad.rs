//! # Launchpad Component
//!
//! Welcome area shown on an empty conversation: the assistant persona and
//! the conversation starters. Hidden as soon as a submission begins.

use crate::core::config::ConversationStarter;
use crate::ui::component::{Comp, CompDescriptor, CompState, ControllerContext};
use crate::ui::components::avatar::{AvatarProps, render_avatar, update_avatar};
use crate::ui::dom::{Element, Node};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaunchpadProps {
    pub persona: AvatarProps,
    pub tagline: Option<String>,
    pub starters: Vec<ConversationStarter>,
    pub visible: bool,
}

pub struct LaunchpadState;

pub type Launchpad = Comp<LaunchpadState>;

impl CompState for LaunchpadState {
    type Props = LaunchpadProps;

    fn descriptor() -> CompDescriptor<Self> {
        CompDescriptor {
            name: "launchpad",
            render: |props, _ctx| render_launchpad(props),
            update: |dom, before, after, _ctx| update_launchpad(dom, before, after),
            actions: vec![],
            listeners: vec![],
        }
    }
}

fn render_persona(props: &LaunchpadProps) -> Element {
    let mut persona = Element::new("div")
        .with_class("launchpad__persona")
        .with_child(render_avatar(&props.persona))
        .with_child(
            Element::new("div")
                .with_class("launchpad__name")
                .with_text(props.persona.name.as_str()),
        );
    if let Some(tagline) = &props.tagline {
        persona.append(
            Element::new("div")
                .with_class("launchpad__tagline")
                .with_text(tagline.as_str()),
        );
    }
    persona
}

fn render_starters(starters: &[ConversationStarter]) -> Element {
    let mut list = Element::new("div").with_class("launchpad__starters");
    for (index, starter) in starters.iter().enumerate() {
        list.append(
            Element::new("button")
                .with_class("conversation-starter")
                .with_attr("data-index", index.to_string())
                .with_text(starter.display_label()),
        );
    }
    list
}

fn body(props: &LaunchpadProps) -> Vec<Node> {
    if !props.visible {
        return vec![];
    }
    let mut children = vec![Node::Element(render_persona(props))];
    if !props.starters.is_empty() {
        children.push(Node::Element(render_starters(&props.starters)));
    }
    children
}

fn render_launchpad(props: &LaunchpadProps) -> Element {
    let mut root = Element::new("div").with_class("launchpad");
    root.children = body(props);
    if !props.visible {
        root.set_attr("hidden", "");
    }
    root
}

fn update_launchpad(dom: &mut Element, before: &LaunchpadProps, after: &LaunchpadProps) {
    if before.visible != after.visible {
        if after.visible {
            dom.remove_attr("hidden");
        } else {
            dom.set_attr("hidden", "");
        }
        dom.replace_children(body(after));
        return;
    }
    if !after.visible {
        return;
    }

    if before.persona.name != after.persona.name || before.tagline != after.tagline {
        if let Some(persona) = dom.query_class_mut("launchpad__persona") {
            *persona = render_persona(after);
        }
    } else if before.persona != after.persona
        && let Some(avatar) = dom.query_class_mut("avatar")
    {
        update_avatar(avatar, &before.persona, &after.persona);
    }
    if before.starters != after.starters {
        dom.children.retain(
            |node| !matches!(node, Node::Element(el) if el.has_class("launchpad__starters")),
        );
        if !after.starters.is_empty() {
            dom.append(render_starters(&after.starters));
        }
    }
}

impl Launchpad {
    pub fn new(context: ControllerContext, props: LaunchpadProps) -> Self {
        Comp::create(context, props, LaunchpadState)
    }

    pub fn is_visible(&self) -> bool {
        self.props().visible
    }

    /// Prompt of the starter at `index`, if it exists and is currently shown.
    pub fn starter_prompt(&self, index: usize) -> Option<&str> {
        if !self.is_visible() {
            return None;
        }
        self.props().starters.get(index).map(|s| s.prompt.as_str())
    }
}
