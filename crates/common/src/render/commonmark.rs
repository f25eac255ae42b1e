use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::html::escape_text;
use super::MarkdownRenderer;
use crate::annotate::tree::PROTECTED_TAGS;
use crate::annotate::{Element, InlineNode};

/// pulldown-cmark with tables, strikethrough, task lists and footnotes.
#[derive(Debug, Clone)]
pub struct CommonMarkRenderer {
    options: Options,
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> Vec<InlineNode> {
        let mut builder = TreeBuilder::new();
        for event in Parser::new_ext(markdown, self.options) {
            builder.event(event);
        }
        builder.finish()
    }
}

/// Builds the node tree from a flat event stream.
///
/// `open` records how many elements each start event pushed, so the matching
/// end event closes exactly those. The bottom of `stack` is the root
/// fragment and is never closed.
///
/// `raw_open` holds protected tags opened by inline HTML such as `<a href>`
/// or `<code>`. Until the matching close tag, text is emitted as raw,
/// already-escaped HTML so annotation never scans it.
struct TreeBuilder {
    stack: Vec<Element>,
    open: Vec<usize>,
    raw_open: Vec<String>,
    alignments: Vec<Alignment>,
    cell: usize,
    in_head: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Element::fragment()],
            open: Vec::new(),
            raw_open: Vec::new(),
            alignments: Vec::new(),
            cell: 0,
            in_head: false,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => self.push_text(text.as_ref()),
            Event::Code(code) => {
                let code = Element::new("code").with_child(InlineNode::text(code.as_ref()));
                self.push(InlineNode::Element(code));
            }
            Event::Html(html) => self.push(InlineNode::raw(html.as_ref())),
            Event::InlineHtml(html) => {
                self.track_inline_tag(&html);
                self.push(InlineNode::raw(html.as_ref()));
            }
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => self.push(InlineNode::Element(Element::new("br"))),
            Event::Rule => self.push(InlineNode::Element(Element::new("hr"))),
            Event::FootnoteReference(name) => {
                let link = Element::new("a")
                    .with_attr("href", format!("#fn-{name}"))
                    .with_child(InlineNode::text(name.as_ref()));
                let sup = Element::new("sup")
                    .with_attr("class", "footnote-reference")
                    .with_child(InlineNode::Element(link));
                self.push(InlineNode::Element(sup));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked {
                    r#"<input type="checkbox" disabled checked>"#
                } else {
                    r#"<input type="checkbox" disabled>"#
                };
                self.push(InlineNode::raw(marker));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let elements = match tag {
            Tag::Paragraph => vec![Element::new("p")],
            Tag::Heading { level, id, .. } => {
                let mut heading = Element::new(format!("h{}", level_to_u8(level)));
                if let Some(id) = id {
                    heading = heading.with_attr("id", id.as_ref());
                }
                vec![heading]
            }
            Tag::BlockQuote(_) => vec![Element::new("blockquote")],
            Tag::CodeBlock(kind) => {
                let mut code = Element::new("code");
                if let CodeBlockKind::Fenced(info) = kind {
                    if let Some(language) = info.split_whitespace().next() {
                        code = code.with_attr("class", format!("language-{language}"));
                    }
                }
                vec![Element::new("pre"), code]
            }
            Tag::List(Some(1)) => vec![Element::new("ol")],
            Tag::List(Some(start)) => vec![Element::new("ol").with_attr("start", start.to_string())],
            Tag::List(None) => vec![Element::new("ul")],
            Tag::Item => vec![Element::new("li")],
            Tag::FootnoteDefinition(name) => {
                let label = Element::new("sup")
                    .with_attr("class", "footnote-definition-label")
                    .with_child(InlineNode::text(name.as_ref()));
                vec![Element::new("div")
                    .with_attr("class", "footnote-definition")
                    .with_attr("id", format!("fn-{name}"))
                    .with_child(InlineNode::Element(label))]
            }
            Tag::Table(alignments) => {
                self.alignments = alignments;
                vec![Element::new("table")]
            }
            Tag::TableHead => {
                self.in_head = true;
                self.cell = 0;
                vec![Element::new("thead"), Element::new("tr")]
            }
            Tag::TableRow => {
                self.cell = 0;
                vec![Element::new("tr")]
            }
            Tag::TableCell => {
                let mut cell = Element::new(if self.in_head { "th" } else { "td" });
                let align = self.alignments.get(self.cell).copied().and_then(alignment_name);
                if let Some(align) = align {
                    cell = cell.with_attr("style", format!("text-align: {align}"));
                }
                self.cell += 1;
                vec![cell]
            }
            Tag::Emphasis => vec![Element::new("em")],
            Tag::Strong => vec![Element::new("strong")],
            Tag::Strikethrough => vec![Element::new("del")],
            Tag::Link { dest_url, title, .. } => {
                let mut link = Element::new("a").with_attr("href", dest_url.as_ref());
                if !title.is_empty() {
                    link = link.with_attr("title", title.as_ref());
                }
                vec![link]
            }
            Tag::Image { dest_url, title, .. } => {
                let mut image = Element::new("img").with_attr("src", dest_url.as_ref());
                if !title.is_empty() {
                    image = image.with_attr("title", title.as_ref());
                }
                vec![image]
            }
            // Html blocks and anything unknown only group their children.
            _ => vec![Element::fragment()],
        };

        self.open.push(elements.len());
        self.stack.extend(elements);
    }

    fn end(&mut self, end: TagEnd) {
        if matches!(end, TagEnd::TableHead) {
            self.in_head = false;
        }
        // An unclosed raw tag does not leak past its block.
        if matches!(end, TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::TableCell) {
            self.raw_open.clear();
        }
        let count = self.open.pop().unwrap_or(0);
        for _ in 0..count {
            self.close();
        }
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(mut element) = self.stack.pop() else {
            return;
        };
        if element.tag == "img" {
            // Alt text lives in an attribute so it is never scanned.
            let alt = element.text_content();
            element.children.clear();
            element.attrs.insert(1, ("alt".to_string(), alt));
        }
        self.push(InlineNode::Element(element));
    }

    fn push_text(&mut self, text: &str) {
        if self.raw_open.is_empty() {
            self.push(InlineNode::text(text));
        } else {
            self.push(InlineNode::raw(escape_text(text)));
        }
    }

    fn track_inline_tag(&mut self, html: &str) {
        let Some(tag) = parse_inline_tag(html) else {
            return;
        };
        if !PROTECTED_TAGS.contains(&tag.name.as_str()) {
            return;
        }
        if tag.closing {
            if let Some(at) = self.raw_open.iter().rposition(|open| *open == tag.name) {
                self.raw_open.truncate(at);
            }
        } else if !tag.self_closing && tag.name != "img" {
            self.raw_open.push(tag.name);
        }
    }

    fn push(&mut self, node: InlineNode) {
        if let Some(parent) = self.stack.last_mut() {
            parent.push(node);
        }
    }

    fn finish(mut self) -> Vec<InlineNode> {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().map(|root| root.children).unwrap_or_default()
    }
}

struct InlineTag {
    name: String,
    closing: bool,
    self_closing: bool,
}

/// Tag name of an inline HTML open or close tag. Comments, declarations and
/// processing instructions yield `None`.
fn parse_inline_tag(html: &str) -> Option<InlineTag> {
    let inner = html.trim().strip_prefix('<')?.strip_suffix('>')?;
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name: String = inner
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    if name.is_empty() || !inner.starts_with(|ch: char| ch.is_ascii_alphabetic()) {
        return None;
    }
    Some(InlineTag { name, closing, self_closing: inner.ends_with('/') })
}

fn alignment_name(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

fn level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::is_protected;
    use crate::annotate::tree::text_runs;
    use crate::render::to_html;

    fn html(markdown: &str) -> String {
        to_html(&CommonMarkRenderer::default().render(markdown))
    }

    #[test]
    fn renders_blocks_and_inlines() {
        assert_eq!(
            html("# Title\n\nSome *soft* and **strong**."),
            "<h1>Title</h1><p>Some <em>soft</em> and <strong>strong</strong>.</p>"
        );
    }

    #[test]
    fn code_block_keeps_language_class() {
        assert_eq!(
            html("```rust\nfn a() {}\n```"),
            "<pre><code class=\"language-rust\">fn a() {}\n</code></pre>"
        );
    }

    #[test]
    fn image_alt_becomes_attribute() {
        assert_eq!(html("![A *portrait*](p.png)"), r#"<p><img src="p.png" alt="A portrait"></p>"#);
    }

    #[test]
    fn table_head_cells_are_th() {
        let out = html("| a | b |\n|:-|--|\n| 1 | 2 |");

        assert!(
            out.starts_with(
                r#"<table><thead><tr><th style="text-align: left">a</th><th>b</th></tr></thead>"#
            ),
            "{out}"
        );
        assert!(out.contains(r#"<tr><td style="text-align: left">1</td><td>2</td></tr>"#), "{out}");
    }

    #[test]
    fn task_list_and_strikethrough() {
        let out = html("- [x] ~~done~~");

        assert!(out.starts_with(r#"<ul><li><input type="checkbox" disabled checked>"#), "{out}");
        assert!(out.ends_with("<del>done</del></li></ul>"), "{out}");
    }

    #[test]
    fn raw_html_passes_through_unescaped() {
        assert_eq!(html("a <kbd>b</kbd>"), "<p>a <kbd>b</kbd></p>");
    }

    #[test]
    fn inline_html_links_and_code_are_not_scanned() {
        let nodes = CommonMarkRenderer::default()
            .render("See <a href=\"x\">Anne</a> and <code>Anne & co</code>, then Anne.");

        let runs = text_runs(&nodes, &is_protected);
        assert_eq!(runs, vec!["See ", " and ", ", then Anne."]);
        assert_eq!(
            to_html(&nodes),
            "<p>See <a href=\"x\">Anne</a> and <code>Anne &amp; co</code>, then Anne.</p>"
        );
    }

    #[test]
    fn unprotected_inline_html_stays_scannable() {
        let nodes = CommonMarkRenderer::default().render("a <kbd>Anne</kbd> <br/> b");

        let runs = text_runs(&nodes, &is_protected);
        assert_eq!(runs.concat(), "a Anne  b");
    }

    #[test]
    fn unclosed_raw_tag_ends_with_its_paragraph() {
        let nodes = CommonMarkRenderer::default().render("<code>Anne\n\nAnne again");

        assert_eq!(text_runs(&nodes, &is_protected), vec!["Anne again"]);
    }

    #[test]
    fn parses_inline_tag_names() {
        let open = parse_inline_tag("<A href=\"x\">").unwrap();
        assert_eq!((open.name.as_str(), open.closing, open.self_closing), ("a", false, false));

        let close = parse_inline_tag("</code>").unwrap();
        assert_eq!((close.name.as_str(), close.closing), ("code", true));

        assert!(parse_inline_tag("<br/>").unwrap().self_closing);
        assert!(parse_inline_tag("<!-- Anne -->").is_none());
    }

    #[test]
    fn soft_breaks_stay_in_one_text_run() {
        let nodes = CommonMarkRenderer::default().render("Anne\nMarie");
        let InlineNode::Element(paragraph) = &nodes[0] else {
            panic!("paragraph expected");
        };

        assert_eq!(paragraph.children, vec![InlineNode::text("Anne\nMarie")]);
    }

    #[test]
    fn ordered_list_start() {
        assert_eq!(html("3. c\n4. d"), r#"<ol start="3"><li>c</li><li>d</li></ol>"#);
    }
}
