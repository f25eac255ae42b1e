// Line-based fallback renderer: headings, `-`/`*` lists, paragraphs, images,
// inline code, bold and italic. Everything else is plain text.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::MarkdownRenderer;
use crate::annotate::{Element, InlineNode};
use crate::section::parser::heading_title;

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)|`([^`]+)`|\*\*([^*]+)\*\*|\*([^*\s][^*]*)\*")
            .expect("inline pattern should compile")
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRenderer;

impl MarkdownRenderer for BasicRenderer {
    fn render(&self, markdown: &str) -> Vec<InlineNode> {
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut list: Option<Element> = None;

        for line in markdown.lines() {
            let trimmed = line.trim_end();

            if let Some(item) = list_item(trimmed) {
                flush_paragraph(&mut paragraph, &mut blocks);
                let mut li = Element::new("li");
                push_inline(&mut li, item);
                list.get_or_insert_with(|| Element::new("ul")).push(InlineNode::Element(li));
                continue;
            }
            if let Some(ul) = list.take() {
                blocks.push(InlineNode::Element(ul));
            }

            if trimmed.trim().is_empty() {
                flush_paragraph(&mut paragraph, &mut blocks);
            } else if let Some((level, title)) = heading(trimmed) {
                flush_paragraph(&mut paragraph, &mut blocks);
                let mut heading = Element::new(format!("h{level}"));
                heading.push(InlineNode::text(title));
                blocks.push(InlineNode::Element(heading));
            } else {
                paragraph.push(trimmed);
            }
        }

        flush_paragraph(&mut paragraph, &mut blocks);
        if let Some(ul) = list {
            blocks.push(InlineNode::Element(ul));
        }
        blocks
    }
}

fn list_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let title = heading_title(line)?;
    let level = line.bytes().take_while(|byte| *byte == b'#').count();
    Some((level, title))
}

fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<InlineNode>) {
    if lines.is_empty() {
        return;
    }
    let mut paragraph = Element::new("p");
    push_inline(&mut paragraph, &lines.join("\n"));
    lines.clear();
    blocks.push(InlineNode::Element(paragraph));
}

fn push_inline(parent: &mut Element, text: &str) {
    let mut cursor = 0usize;
    for caps in inline_pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            parent.push(InlineNode::text(&text[cursor..whole.start()]));
        }
        parent.push(InlineNode::Element(inline_element(&caps)));
        cursor = whole.end();
    }
    if cursor < text.len() {
        parent.push(InlineNode::text(&text[cursor..]));
    }
}

fn inline_element(caps: &Captures<'_>) -> Element {
    let group = |index: usize| caps.get(index).map(|m| m.as_str());

    if let (Some(alt), Some(src)) = (group(1), group(2)) {
        return Element::new("img").with_attr("src", src).with_attr("alt", alt);
    }
    if let Some(code) = group(3) {
        return Element::new("code").with_child(InlineNode::text(code));
    }
    if let Some(bold) = group(4) {
        return Element::new("strong").with_child(InlineNode::text(bold));
    }
    Element::new("em").with_child(InlineNode::text(group(5).unwrap_or_default()))
}
