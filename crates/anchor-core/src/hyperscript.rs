//! Hyperscript-style convenience builder.
//!
//! `h("div.card#main", props, children)` parses the selector into a tag, an
//! id, and classes, merges them into the props, and builds an element view.
//! A selector with no leading tag (`".card"`) defaults to `div`.

use crate::{el, Props, Value, View};

pub fn h(selector: &str, mut props: Props, children: Vec<View>) -> View {
    let parsed = parse_selector(selector);
    if let Some(id) = parsed.id {
        props.insert("id", Value::Str(id));
    }
    if let Some(class) = parsed.class {
        props.insert("class", Value::Str(class));
    }
    match children.len() {
        0 => {}
        1 => props.insert("children", children.into_iter().next().expect("one child")),
        _ => props.insert("children", children),
    }
    el(parsed.tag, props)
}

struct ParsedSelector {
    tag: String,
    id: Option<String>,
    class: Option<String>,
}

fn split_segments(selector: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, ch) in selector.char_indices() {
        if index != 0 && (ch == '.' || ch == '#') {
            segments.push(&selector[start..index]);
            start = index;
        }
    }
    if start < selector.len() {
        segments.push(&selector[start..]);
    }
    segments
}

fn parse_selector(selector: &str) -> ParsedSelector {
    let mut tag = None;
    let mut id = None;
    let mut classes: Vec<&str> = Vec::new();
    for segment in split_segments(selector) {
        match segment.as_bytes().first() {
            Some(b'#') if segment.len() > 1 => id = Some(segment[1..].to_string()),
            Some(b'.') if segment.len() > 1 => classes.push(&segment[1..]),
            Some(b'#') | Some(b'.') | None => {}
            Some(_) => tag = Some(segment.to_string()),
        }
    }
    ParsedSelector {
        tag: tag.unwrap_or_else(|| "div".to_string()),
        id,
        class: if classes.is_empty() {
            None
        } else {
            Some(classes.join(" "))
        },
    }
}

