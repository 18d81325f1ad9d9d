//! # DOM
//!
//! A small owned element tree. Every component owns exactly one [`Element`]
//! (its subtree) and patches it in place; containers compose their children's
//! subtrees into a fresh tree when the widget is painted into a [`Document`].
//!
//! Text nodes are escaped when serialised. [`Node::Markup`] holds an already
//! rendered HTML fragment (markdown output) and is emitted verbatim.

use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Markup(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    // ── Builders ────────────────────────────────────────────────────────

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    // ── Classes & attributes ────────────────────────────────────────────

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    /// Adds or removes `class` depending on `on`.
    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.remove(name);
    }

    // ── Children ────────────────────────────────────────────────────────

    pub fn append(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Appends a text node. Used for incremental streaming: prior nodes are untouched.
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn replace_children(&mut self, children: Vec<Node>) {
        self.children = children;
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Depth-first search (self included) for the first element matching `pred`.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(pred))
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        if pred(self) {
            return Some(self);
        }
        for node in self.children.iter_mut() {
            if let Node::Element(child) = node
                && let Some(found) = child.find_mut(pred)
            {
                return Some(found);
            }
        }
        None
    }

    pub fn query_class(&self, class: &str) -> Option<&Element> {
        self.find(&|el| el.has_class(class))
    }

    pub fn query_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        self.find_mut(&|el| el.has_class(class))
    }

    /// All elements carrying `class`, in document order.
    pub fn query_all_class(&self, class: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect(&|el| el.has_class(class), &mut out);
        out
    }

    pub fn query_id(&self, id: &str) -> Option<&Element> {
        self.find(&|el| el.attr("id") == Some(id))
    }

    pub fn query_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.find_mut(&|el| el.attr("id") == Some(id))
    }

    fn collect<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if pred(self) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.collect(pred, out);
        }
    }

    /// Concatenated text of the subtree. Markup fragments contribute their text with tags stripped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Element(el) => el.write_text(out),
                Node::Text(t) => out.push_str(t),
                Node::Markup(m) => out.push_str(&strip_tags(m)),
            }
        }
    }

    // ── Serialisation ───────────────────────────────────────────────────

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            if value.is_empty() {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{}\"", escape(value));
            }
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(el) => el.write_html(out),
                Node::Text(t) => out.push_str(&escape(t)),
                Node::Markup(m) => out.push_str(m),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

/// Escapes the five HTML-significant characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// Document
// ============================================================================

/// The host page the widget is mounted into. Mount targets are found by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub body: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
        }
    }

    /// Document whose body holds one empty `<div id=...>` mount target.
    pub fn with_mount_point(id: &str) -> Self {
        let mut doc = Self::new();
        doc.body.append(Element::new("div").with_attr("id", id));
        doc
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<&Element> {
        self.body.query_id(id)
    }

    pub fn get_element_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.body.query_id_mut(id)
    }

    pub fn query_class(&self, class: &str) -> Option<&Element> {
        self.body.query_class(class)
    }

    pub fn query_all_class(&self, class: &str) -> Vec<&Element> {
        self.body.query_all_class(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("div")
            .with_class("outer")
            .with_child(
                Element::new("p")
                    .with_class("inner")
                    .with_attr("data-x", "1")
                    .with_text("a < b"),
            )
            .with_child(Element::new("p").with_class("inner").with_text("second"))
    }

    #[test]
    fn test_query_class_finds_first_match() {
        let el = sample();
        let found = el.query_class("inner").unwrap();
        assert_eq!(found.attr("data-x"), Some("1"));
        assert_eq!(el.query_all_class("inner").len(), 2);
        assert!(el.query_class("missing").is_none());
    }

    #[test]
    fn test_html_escapes_text_and_attrs() {
        let el = Element::new("span").with_attr("title", "\"q\"").with_text("<b>");
        assert_eq!(el.to_html(), "<span title=\"&quot;q&quot;\">&lt;b&gt;</span>");
    }

    #[test]
    fn test_boolean_attribute_serialises_bare() {
        let el = Element::new("button").with_attr("disabled", "");
        assert_eq!(el.to_html(), "<button disabled></button>");
    }

    #[test]
    fn test_markup_is_verbatim_but_text_content_strips_tags() {
        let mut el = Element::new("div");
        el.children.push(Node::Markup("<p>Hi &amp; bye</p>".to_string()));
        assert_eq!(el.to_html(), "<div><p>Hi &amp; bye</p></div>");
        assert_eq!(el.text_content(), "Hi & bye");
    }

    #[test]
    fn test_append_text_keeps_existing_nodes() {
        let mut el = Element::new("div");
        el.append_text("Hel");
        el.append_text("lo");
        assert_eq!(el.children.len(), 2);
        assert_eq!(el.text_content(), "Hello");
    }

    #[test]
    fn test_toggle_class_is_idempotent() {
        let mut el = Element::new("div");
        el.toggle_class("on", true);
        el.toggle_class("on", true);
        assert_eq!(el.classes, vec!["on".to_string()]);
        el.toggle_class("on", false);
        assert!(el.classes.is_empty());
    }

    #[test]
    fn test_document_mount_point_lookup() {
        let mut doc = Document::with_mount_point("root");
        assert!(doc.get_element_by_id("root").is_some());
        assert!(doc.get_element_by_id("nope").is_none());
        doc.get_element_by_id_mut("root").unwrap().append_text("x");
        assert_eq!(doc.body.text_content(), "x");
    }
}
