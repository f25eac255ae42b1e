// Inline node tree for rendered markdown, and a text-run walker that skips
// protected elements.
//
// Text nodes hold unescaped text; escaping happens once, at HTML
// serialization. `Raw` nodes are pre-rendered HTML and are never scanned.

use serde::Serialize;

use crate::types::{MatchKind, TagColor, TextMatch};

/// Elements whose text must never be scanned or split.
pub const PROTECTED_TAGS: &[&str] =
    &["a", "code", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "script", "style", "img"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineNode {
    Text { text: String },
    Element(Element),
    Raw { html: String },
    Annotation(Annotation),
}

impl InlineNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn raw(html: impl Into<String>) -> Self {
        Self::Raw { html: html.into() }
    }
}

/// An HTML element. An empty `tag` is a fragment: only its children render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<InlineNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Self::default() }
    }

    pub fn fragment() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: InlineNode) -> Self {
        self.push(child);
        self
    }

    pub fn is_fragment(&self) -> bool {
        self.tag.is_empty()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Append a child, merging adjacent text nodes into one run.
    pub fn push(&mut self, child: InlineNode) {
        push_node(&mut self.children, child);
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

/// A matched span replaced by styled, annotated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub kind: MatchKind,
    /// Matched text exactly as it appeared.
    pub text: String,
    /// Entity name as stored, or the tag without `#`.
    pub key: String,
    pub color: Option<TagColor>,
}

impl From<TextMatch> for Annotation {
    fn from(found: TextMatch) -> Self {
        Self { kind: found.kind, text: found.text, key: found.key, color: found.color }
    }
}

/// Default protection predicate: code, links, headings, images and raw
/// script/style containers.
pub fn is_protected(element: &Element) -> bool {
    PROTECTED_TAGS.contains(&element.tag.as_str())
}

/// Append `node` to `nodes`, merging it into a trailing text node.
pub fn push_node(nodes: &mut Vec<InlineNode>, node: InlineNode) {
    if let InlineNode::Text { text } = &node {
        if let Some(InlineNode::Text { text: last }) = nodes.last_mut() {
            last.push_str(text);
            return;
        }
    }
    nodes.push(node);
}

/// Replace scannable text runs.
///
/// `rewrite` is called once per text node outside protected elements; a
/// `Some` result is spliced in place of that node. Annotations, raw nodes
/// and anything inside a protected element are left alone, and the
/// replacement nodes are not revisited.
pub fn rewrite_text_runs<P, F>(nodes: &mut Vec<InlineNode>, is_protected: &P, rewrite: &mut F)
where
    P: Fn(&Element) -> bool + ?Sized,
    F: FnMut(&str) -> Option<Vec<InlineNode>>,
{
    let mut out = Vec::with_capacity(nodes.len());
    for node in std::mem::take(nodes) {
        match node {
            InlineNode::Text { text } => match rewrite(&text) {
                Some(replacement) => out.extend(replacement),
                None => out.push(InlineNode::Text { text }),
            },
            InlineNode::Element(mut element) => {
                if !is_protected(&element) {
                    rewrite_text_runs(&mut element.children, is_protected, rewrite);
                }
                out.push(InlineNode::Element(element));
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

/// Text runs that an annotation pass would scan, in document order.
pub fn text_runs<'a, P>(nodes: &'a [InlineNode], is_protected: &P) -> Vec<&'a str>
where
    P: Fn(&Element) -> bool + ?Sized,
{
    let mut runs = Vec::new();
    visit_runs(nodes, is_protected, &mut runs);
    runs
}

fn visit_runs<'a, P>(nodes: &'a [InlineNode], is_protected: &P, runs: &mut Vec<&'a str>)
where
    P: Fn(&Element) -> bool + ?Sized,
{
    for node in nodes {
        match node {
            InlineNode::Text { text } => runs.push(text),
            InlineNode::Element(element) if !is_protected(element) => {
                visit_runs(&element.children, is_protected, runs)
            }
            _ => {}
        }
    }
}

fn collect_text(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text { text } => out.push_str(text),
            InlineNode::Element(element) => collect_text(&element.children, out),
            InlineNode::Annotation(annotation) => out.push_str(&annotation.text),
            InlineNode::Raw { .. } => {}
        }
    }
}
