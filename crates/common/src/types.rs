// Core domain types shared across all Storyloom crates.

use serde::{Deserialize, Serialize};

/// A titled block of the entity document (`## <title>\n\n<body>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Heading text without the `#` marker, trimmed. Unique after a merge.
    pub title: String,
    /// Everything under the heading, verbatim (blank lines and trailing
    /// whitespace included).
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }
}

/// One element of a story's tile order record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileEntry {
    /// Opaque id, stable across reorders and never reused.
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl TileEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into() }
    }
}

/// A tile with its content loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tile {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Display colors derived from a tag string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TagColor {
    /// Hue in degrees, `0..360`.
    pub hue: u16,
    /// Light pastel CSS color, e.g. `hsl(212, 60%, 85%)`.
    pub background: String,
    /// Darker CSS color of the same hue.
    pub foreground: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Entity,
    Tag,
}

/// A candidate or selected annotation span inside one text run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextMatch {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset just past the match (half-open).
    pub end: usize,
    /// The matched source text, verbatim.
    pub text: String,
    /// Entity name as stored, or the tag without its `#`.
    pub key: String,
    pub kind: MatchKind,
    pub color: Option<TagColor>,
}

impl TextMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}
