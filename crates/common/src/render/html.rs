// HTML serialization of an inline node tree.

use crate::annotate::{Annotation, Element, InlineNode};
use crate::section::slug::entity_anchor;
use crate::types::{MatchKind, TagColor};

/// Elements written without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

pub fn to_html(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_nodes(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text { text } => out.push_str(&escape_text(text)),
            InlineNode::Raw { html } => out.push_str(html),
            InlineNode::Element(element) => write_element(element, out),
            InlineNode::Annotation(annotation) => write_annotation(annotation, out),
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    if element.is_fragment() {
        write_nodes(&element.children, out);
        return;
    }

    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        write_attr(name, value, out);
    }
    out.push('>');

    if VOID_TAGS.contains(&element.tag.as_str()) {
        return;
    }
    write_nodes(&element.children, out);
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn write_annotation(annotation: &Annotation, out: &mut String) {
    let tag = match annotation.kind {
        MatchKind::Entity => {
            out.push_str(r#"<a class="entity-hl""#);
            write_attr("data-entity-name", &annotation.key, out);
            write_attr("data-entity-type", "highlights", out);
            write_attr("href", &format!("#{}", entity_anchor(&annotation.key)), out);
            "a"
        }
        MatchKind::Tag => {
            out.push_str(r#"<span class="tag""#);
            write_attr("data-tag", &annotation.key, out);
            "span"
        }
    };
    if let Some(color) = &annotation.color {
        write_attr("style", &color_style(color), out);
    }
    out.push('>');
    out.push_str(&escape_text(&annotation.text));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn color_style(color: &TagColor) -> String {
    format!("background: {}; color: {}", color.background, color.foreground)
}

fn write_attr(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}
