// Merge one edited entity section into the stored document.
//
// Every other section keeps its text and position. Writers hold no lock: two
// concurrent merges of different sections are structurally safe, two merges
// of the same section are last-write-wins.

use std::collections::HashSet;

use thiserror::Error;

use super::parser::{compose_document, heading_title, parse_document, split_block};
use crate::types::Section;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("title required")]
    TitleRequired,
}

/// An edited section about to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEdit {
    pub title: String,
    pub body: String,
    /// Title the section had when the edit started, if it may have been renamed.
    pub original_title: Option<String>,
}

impl SectionEdit {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into(), original_title: None }
    }

    pub fn renamed_from(mut self, original_title: impl Into<String>) -> Self {
        self.original_title = Some(original_title.into());
        self
    }

    /// Interpret raw editor content.
    ///
    /// A leading heading line supplies the title and the rest (minus one
    /// blank line under the heading) is the body. Without a heading the whole
    /// content is the body of `view_title`. The content is never trimmed.
    pub fn from_editor(content: &str, view_title: Option<&str>) -> Result<Self, MergeError> {
        let first_line = content.split('\n').next().unwrap_or_default();
        let view_title = view_title.map(str::trim).filter(|title| !title.is_empty());

        let (title, body) = if heading_title(first_line).is_some() {
            let (heading, body) = split_block(content);
            let title = if heading.is_empty() { view_title } else { Some(heading) };
            (title, body)
        } else {
            (view_title, content)
        };

        let title = title.ok_or(MergeError::TitleRequired)?;
        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
            original_title: view_title.map(str::to_string),
        })
    }
}

/// Result of a merge. `Unchanged` means nothing should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    Replaced(String),
    Appended(String),
}

impl MergeOutcome {
    /// The new document text, if the merge changed anything.
    pub fn document(&self) -> Option<&str> {
        match self {
            Self::Unchanged => None,
            Self::Replaced(document) | Self::Appended(document) => Some(document),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Merge `edit` into the entity document `existing`.
///
/// The target is looked up by `original_title`, then by the edited title; a
/// miss appends. A target that keeps its title and body byte-for-byte is a
/// no-op. Afterwards each title appears once: the edited section wins over
/// every other section with its title, other duplicates keep their first
/// occurrence.
pub fn merge_section(existing: &str, edit: &SectionEdit) -> Result<MergeOutcome, MergeError> {
    let title = edit.title.trim();
    if title.is_empty() {
        return Err(MergeError::TitleRequired);
    }

    let mut document = parse_document(existing);
    let target = edit
        .original_title
        .as_deref()
        .and_then(|original| document.position(original))
        .or_else(|| document.position(title));

    if let Some(index) = target {
        let current = &document.sections[index];
        if current.title == title && current.body == edit.body {
            return Ok(MergeOutcome::Unchanged);
        }
    }

    let edited = Section::new(title, edit.body.clone());
    let edited_index = match target {
        Some(index) => {
            document.sections[index] = edited;
            index
        }
        None => {
            document.sections.push(edited);
            document.sections.len() - 1
        }
    };

    let mut seen = HashSet::new();
    document.sections = std::mem::take(&mut document.sections)
        .into_iter()
        .enumerate()
        .filter(|(index, section)| {
            if *index == edited_index {
                true
            } else if section.title == title {
                false
            } else {
                seen.insert(section.title.clone())
            }
        })
        .map(|(_, section)| section)
        .collect();

    let composed = compose_document(&document);
    Ok(match target {
        Some(_) => MergeOutcome::Replaced(composed),
        None => MergeOutcome::Appended(composed),
    })
}

/// Append an empty section named `name` unless one already exists.
///
/// Returns the new document, or `None` when nothing needs writing.
pub fn ensure_section(existing: &str, name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut document = parse_document(existing);
    if document.find(name).is_some() {
        return None;
    }
    document.sections.push(Section::new(name, ""));
    Some(compose_document(&document))
}
