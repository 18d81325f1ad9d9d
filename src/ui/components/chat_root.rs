//! # ChatRoot Component
//!
//! Outer chrome of the widget: theme class, host class name and sizing.
//! Segments, launchpad and composer are composed into it at paint time.

use crate::core::config::{DEFAULT_THEME_ID, LayoutOptions};
use crate::ui::component::{Comp, CompDescriptor, CompState, ControllerContext};
use crate::ui::dom::Element;

pub const ROOT_CLASS: &str = "murmur-chat-root";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRootProps {
    pub theme_id: String,
    pub class_name: Option<String>,
    pub layout: LayoutOptions,
}

impl Default for ChatRootProps {
    fn default() -> Self {
        Self {
            theme_id: DEFAULT_THEME_ID.to_string(),
            class_name: None,
            layout: LayoutOptions::default(),
        }
    }
}

pub struct ChatRootState;

pub type ChatRoot = Comp<ChatRootState>;

impl CompState for ChatRootState {
    type Props = ChatRootProps;

    fn descriptor() -> CompDescriptor<Self> {
        CompDescriptor {
            name: "chatRoot",
            render: |props, _ctx| render_root(props),
            update: |dom, before, after, _ctx| update_root(dom, before, after),
            actions: vec![],
            listeners: vec![],
        }
    }
}

fn theme_class(theme_id: &str) -> String {
    format!("murmur-theme-{theme_id}")
}

fn render_root(props: &ChatRootProps) -> Element {
    let mut root = Element::new("div")
        .with_class(ROOT_CLASS)
        .with_class(&theme_class(&props.theme_id));
    if let Some(class_name) = &props.class_name {
        root.add_class(class_name);
    }
    if let Some(style) = props.layout.inline_style() {
        root.set_attr("style", style);
    }
    root
}

fn update_root(dom: &mut Element, before: &ChatRootProps, after: &ChatRootProps) {
    if before.theme_id != after.theme_id {
        dom.remove_class(&theme_class(&before.theme_id));
        dom.add_class(&theme_class(&after.theme_id));
    }
    if before.class_name != after.class_name {
        if let Some(old) = &before.class_name {
            dom.remove_class(old);
        }
        if let Some(new) = &after.class_name {
            dom.add_class(new);
        }
    }
    if before.layout != after.layout {
        match after.layout.inline_style() {
            Some(style) => dom.set_attr("style", style),
            None => dom.remove_attr("style"),
        }
    }
}

impl ChatRoot {
    pub fn new(context: ControllerContext, props: ChatRootProps) -> Self {
        Comp::create(context, props, ChatRootState)
    }
}
