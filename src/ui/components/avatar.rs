//! # Avatar
//!
//! Persona picture with a first-letter fallback. Not a component of its own:
//! chat items and the launchpad embed the avatar in their subtree and call
//! this render/update pair from their own descriptors.

use crate::ui::dom::{Element, Node};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AvatarProps {
    pub name: String,
    /// Picture URL. Without one only the letter is shown.
    pub picture: Option<String>,
}

/// Uppercased first character of `name`, or empty.
fn letter(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

fn picture(url: &str, name: &str) -> Element {
    Element::new("img")
        .with_class("avatar__picture")
        .with_attr("src", url)
        .with_attr("alt", name)
}

pub fn render_avatar(props: &AvatarProps) -> Element {
    let mut container = Element::new("div")
        .with_class("avatar__container")
        .with_child(
            Element::new("span")
                .with_class("avatar__letter")
                .with_text(letter(&props.name)),
        );
    if let Some(url) = &props.picture {
        container.append(picture(url, &props.name));
    }
    Element::new("div")
        .with_class("avatar")
        .with_attr("title", props.name.as_str())
        .with_child(container)
}

/// Patches only what changed between `before` and `after`.
pub fn update_avatar(dom: &mut Element, before: &AvatarProps, after: &AvatarProps) {
    if before.name != after.name {
        dom.set_attr("title", after.name.as_str());
        if let Some(letter_el) = dom.query_class_mut("avatar__letter") {
            letter_el.replace_children(vec![Node::Text(letter(&after.name))]);
        }
        if let Some(img) = dom.query_class_mut("avatar__picture") {
            img.set_attr("alt", after.name.as_str());
        }
    }

    if before.picture != after.picture
        && let Some(container) = dom.query_class_mut("avatar__container")
    {
        container
            .children
            .retain(|node| !matches!(node, Node::Element(el) if el.has_class("avatar__picture")));
        if let Some(url) = &after.picture {
            container.append(picture(url, &after.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str, picture: Option<&str>) -> AvatarProps {
        AvatarProps {
            name: name.to_string(),
            picture: picture.map(str::to_string),
        }
    }

    fn letter_of(dom: &Element) -> String {
        dom.query_class("avatar__letter").unwrap().text_content()
    }

    #[test]
    fn test_render_shows_uppercased_letter() {
        let dom = render_avatar(&props("iBot", None));
        assert_eq!(letter_of(&dom), "I");
        assert!(dom.query_class("avatar__picture").is_none());
    }

    #[test]
    fn test_render_includes_picture() {
        let dom = render_avatar(&props("Alex", Some("https://example.com/a.png")));
        let img = dom.query_class("avatar__picture").unwrap();
        assert_eq!(img.attr("src"), Some("https://example.com/a.png"));
        assert_eq!(img.attr("alt"), Some("Alex"));
    }

    #[test]
    fn test_name_change_updates_letter() {
        let before = props("alex", Some("https://example.com/a.png"));
        let after = props("Sam", Some("https://example.com/a.png"));
        let mut dom = render_avatar(&before);
        update_avatar(&mut dom, &before, &after);
        assert_eq!(letter_of(&dom), "S");
        assert_eq!(dom.attr("title"), Some("Sam"));
        let img = dom.query_class("avatar__picture").unwrap();
        assert_eq!(img.attr("alt"), Some("Sam"));
    }

    #[test]
    fn test_update_is_noop_when_unchanged() {
        let props = props("Kim", None);
        let mut dom = render_avatar(&props);
        let before = dom.clone();
        update_avatar(&mut dom, &props, &props.clone());
        assert_eq!(dom, before);
    }

    #[test]
    fn test_picture_swap_and_removal() {
        let a = props("Kim", Some("a.png"));
        let b = props("Kim", Some("b.png"));
        let none = props("Kim", None);
        let mut dom = render_avatar(&a);

        update_avatar(&mut dom, &a, &b);
        let pictures = dom.query_all_class("avatar__picture");
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].attr("src"), Some("b.png"));

        update_avatar(&mut dom, &b, &none);
        assert!(dom.query_class("avatar__picture").is_none());
        assert_eq!(letter_of(&dom), "K");
    }

    #[test]
    fn test_empty_name_has_empty_letter() {
        assert_eq!(letter(""), "");
        assert_eq!(letter("élan"), "É");
    }
}
