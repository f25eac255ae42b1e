// Entity and tag annotation over rendered text runs.
//
// For each scannable run: collect whole-word, case-insensitive entity
// matches plus `#tag` matches, order them by (start, longest first), keep
// each one that starts at or after the end of the last kept match, and
// splice the survivors in as annotation nodes.

pub mod tree;

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

use crate::section::parser::parse_sections;
use crate::tag::{color_of, extract_tags, first_tag, tag_spans};
use crate::types::{MatchKind, Section, TagColor, TextMatch};

pub use tree::{is_protected, Annotation, Element, InlineNode};

#[derive(Debug, Clone)]
struct EntityEntry {
    name: String,
    pattern: Regex,
    /// Color of the first tag in the entity's own section.
    color: Option<TagColor>,
    tags: BTreeSet<String>,
}

/// Known entity names with their derived colors and tag sets.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    entries: Vec<EntityEntry>,
}

impl EntityIndex {
    /// One entry per distinct title; later duplicates are ignored.
    pub fn from_sections(sections: &[Section]) -> Self {
        let mut entries: Vec<EntityEntry> = Vec::with_capacity(sections.len());
        for section in sections {
            let name = section.title.trim();
            if name.is_empty() || entries.iter().any(|entry| entry.name == name) {
                continue;
            }
            let Some(pattern) = literal_pattern(name) else {
                continue;
            };
            entries.push(EntityEntry {
                name: name.to_string(),
                pattern,
                color: first_tag(&section.body).map(|tag| color_of(&tag)),
                tags: extract_tags(&section.body),
            });
        }
        Self { entries }
    }

    /// Build from a raw entity document.
    pub fn from_document(body: &str) -> Self {
        Self::from_sections(&parse_sections(body))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn color_of(&self, name: &str) -> Option<&TagColor> {
        self.entry(name).and_then(|entry| entry.color.as_ref())
    }

    pub fn tags_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.entry(name).map(|entry| &entry.tags)
    }

    /// Whether `name` belongs in an entity list filtered by `active_tag`.
    ///
    /// Only list membership depends on this; annotation never consults it.
    pub fn matches_filter(&self, name: &str, active_tag: Option<&str>) -> bool {
        match active_tag {
            None => true,
            Some(tag) => self.tags_of(name).is_some_and(|tags| tags.contains(tag)),
        }
    }

    fn entry(&self, name: &str) -> Option<&EntityEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

fn literal_pattern(name: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(name)).case_insensitive(true).build().ok()
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn on_word_boundaries(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Non-overlapping whole-word matches of `pattern`, left to right.
fn whole_word_matches<'t>(pattern: &Regex, text: &'t str) -> Vec<regex::Match<'t>> {
    let mut found = Vec::new();
    let mut position = 0usize;

    while position <= text.len() {
        let Some(candidate) = pattern.find_at(text, position) else {
            break;
        };
        if candidate.is_empty() {
            break;
        }
        if on_word_boundaries(text, candidate.start(), candidate.end()) {
            position = candidate.end();
            found.push(candidate);
        } else {
            let step = text[candidate.start()..].chars().next().map_or(1, char::len_utf8);
            position = candidate.start() + step;
        }
    }

    found
}

/// Whole-word, case-insensitive occurrences of `name` in `text`.
pub fn count_mentions(text: &str, name: &str) -> usize {
    let name = name.trim();
    if name.is_empty() || text.is_empty() {
        return 0;
    }
    literal_pattern(name).map_or(0, |pattern| whole_word_matches(&pattern, text).len())
}

/// Every entity candidate in `text`, overlaps included.
pub fn entity_spans(text: &str, index: &EntityIndex) -> Vec<TextMatch> {
    let mut spans = Vec::new();
    for entry in &index.entries {
        for found in whole_word_matches(&entry.pattern, text) {
            spans.push(TextMatch {
                start: found.start(),
                end: found.end(),
                text: found.as_str().to_string(),
                key: entry.name.clone(),
                kind: MatchKind::Entity,
                color: entry.color.clone(),
            });
        }
    }
    spans
}

/// Earliest start wins; among equal starts the longest wins; anything
/// overlapping a kept match is dropped.
pub fn select_non_overlapping(mut candidates: Vec<TextMatch>) -> Vec<TextMatch> {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.len().cmp(&a.len())));

    let mut selected: Vec<TextMatch> = Vec::with_capacity(candidates.len());
    let mut last_end = 0usize;
    for candidate in candidates {
        if candidate.start >= last_end {
            last_end = candidate.end;
            selected.push(candidate);
        }
    }
    selected
}

/// Selected entity and tag matches for one text run.
pub fn find_matches(text: &str, index: &EntityIndex) -> Vec<TextMatch> {
    let mut candidates = entity_spans(text, index);
    candidates.extend(tag_spans(text));
    select_non_overlapping(candidates)
}

/// Split `text` around `matches` (sorted, non-overlapping) into text and
/// annotation nodes.
pub fn splice_matches(text: &str, matches: Vec<TextMatch>) -> Vec<InlineNode> {
    let mut nodes = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0usize;
    for found in matches {
        if found.start > cursor {
            nodes.push(InlineNode::text(&text[cursor..found.start]));
        }
        cursor = found.end;
        nodes.push(InlineNode::Annotation(found.into()));
    }
    if cursor < text.len() {
        nodes.push(InlineNode::text(&text[cursor..]));
    }
    nodes
}

/// Annotate a rendered tree, skipping elements the default predicate protects.
pub fn annotate_nodes(nodes: &mut Vec<InlineNode>, index: &EntityIndex) {
    annotate_nodes_with(nodes, index, &is_protected);
}

/// Annotate a rendered tree with a caller-supplied protection predicate.
pub fn annotate_nodes_with<P>(nodes: &mut Vec<InlineNode>, index: &EntityIndex, is_protected: &P)
where
    P: Fn(&Element) -> bool + ?Sized,
{
    tree::rewrite_text_runs(nodes, is_protected, &mut |text: &str| {
        let matches = find_matches(text, index);
        (!matches.is_empty()).then(|| splice_matches(text, matches))
    });
}
