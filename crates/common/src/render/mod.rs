// Markdown rendering into an inline node tree, plus the preview pipeline:
// render, annotate, serialize.

mod basic;
mod commonmark;
mod html;

use serde::{Deserialize, Serialize};

use crate::annotate::{annotate_nodes, EntityIndex, InlineNode};

pub use basic::BasicRenderer;
pub use commonmark::CommonMarkRenderer;
pub use html::{escape_attr, escape_text, to_html};

/// Anything that turns markdown into an inline node tree.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Vec<InlineNode>;
}

/// Which renderer a studio uses; `basic` is the degraded path.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    #[default]
    CommonMark,
    Basic,
}

impl RenderEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommonMark => "commonmark",
            Self::Basic => "basic",
        }
    }
}

pub fn renderer_for(engine: RenderEngine) -> Box<dyn MarkdownRenderer> {
    match engine {
        RenderEngine::CommonMark => Box::new(CommonMarkRenderer::default()),
        RenderEngine::Basic => Box::new(BasicRenderer),
    }
}

/// Render `markdown`, annotate entity and tag mentions, and serialize to HTML.
pub fn render_preview(markdown: &str, renderer: &dyn MarkdownRenderer, index: &EntityIndex) -> String {
    let mut nodes = renderer.render(markdown);
    annotate_nodes(&mut nodes, index);
    to_html(&nodes)
}
