use serde::{Deserialize, Serialize};

use crate::types::Section;

/// Maximum number of `#` characters in a heading marker.
const MAX_HEADING_LEVEL: usize = 6;

/// Separator written between composed section blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// A parsed entity document: free text before the first heading plus the
/// ordered sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionDocument {
    /// Verbatim text preceding the first heading (including its line breaks).
    pub preamble: String,
    pub sections: Vec<Section>,
}

impl SectionDocument {
    /// First section with the given title.
    pub fn find(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title == title)
    }

    pub fn position(&self, title: &str) -> Option<usize> {
        self.sections.iter().position(|section| section.title == title)
    }
}

/// Parse an entity document into its ordered sections.
pub fn parse_sections(body: &str) -> Vec<Section> {
    parse_document(body).sections
}

/// Parse an entity document, keeping any text before the first heading.
pub fn parse_document(body: &str) -> SectionDocument {
    let starts = heading_offsets(body);
    let Some(&first) = starts.first() else {
        return SectionDocument { preamble: body.to_string(), sections: Vec::new() };
    };

    let mut sections = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let next = starts.get(index + 1).copied();
        // The `\n` right before the next heading is the line boundary, not body.
        let end = next.map(|offset| offset - 1).unwrap_or(body.len());
        let (title, mut section_body) = split_block(&body[start..end]);

        if next.is_some() {
            section_body = section_body.strip_suffix('\n').unwrap_or(section_body);
        }
        if title.is_empty() {
            continue;
        }
        sections.push(Section::new(title, section_body));
    }

    SectionDocument { preamble: body[..first].to_string(), sections }
}

/// `## {title}\n\n{body}`.
pub fn compose_section(title: &str, body: &str) -> String {
    format!("## {title}\n\n{body}")
}

/// Join composed sections with one blank line between blocks.
pub fn compose_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|section| compose_section(&section.title, &section.body))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Preamble followed by the composed sections. A preamble that does not end
/// on a line boundary gets a blank line so the first heading stays a heading.
pub fn compose_document(document: &SectionDocument) -> String {
    let mut out = document.preamble.clone();
    if !out.is_empty() && !out.ends_with('\n') && !document.sections.is_empty() {
        out.push_str(BLOCK_SEPARATOR);
    }
    out.push_str(&compose_sections(&document.sections));
    out
}

/// Heading text of a line (`#`–`######` then a space or tab), trimmed.
pub fn heading_title(line: &str) -> Option<&str> {
    let hashes = line.bytes().take_while(|byte| *byte == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(rest.trim())
}

/// Split a heading block into its title and body.
///
/// The first line is the heading. The body starts after it, minus one blank
/// line directly under the heading.
pub(crate) fn split_block(block: &str) -> (&str, &str) {
    let (heading_line, rest) = match block.find('\n') {
        Some(newline) => (&block[..newline], &block[newline + 1..]),
        None => (block, ""),
    };
    let title = heading_title(heading_line).unwrap_or_else(|| heading_line.trim());
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);
    (title, body)
}

/// Byte offsets of every line that starts a heading.
fn heading_offsets(body: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut line_start = 0usize;

    for line in body.split('\n') {
        if heading_title(line).is_some() {
            offsets.push(line_start);
        }
        line_start += line.len() + 1;
    }

    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(pairs: &[(&str, &str)]) -> Vec<Section> {
        pairs.iter().map(|(title, body)| Section::new(*title, *body)).collect()
    }

    #[test]
    fn parses_composed_blocks_in_order() {
        let body = "## Hero\n\nBrave.\n\n## Villain\n\nSneaky.";
        let parsed = parse_sections(body);

        assert_eq!(parsed, sections(&[("Hero", "Brave."), ("Villain", "Sneaky.")]));
    }

    #[test]
    fn keeps_interior_and_trailing_blank_lines() {
        let list = sections(&[("Hero", "Line one.\n\n\nLine two.\n\n"), ("Villain", "x\n")]);
        let composed = compose_sections(&list);

        assert_eq!(parse_sections(&composed), list);
    }

    #[test]
    fn empty_bodies_round_trip() {
        let list = sections(&[("A", ""), ("B", ""), ("C", "")]);
        let composed = compose_sections(&list);

        assert_eq!(composed, "## A\n\n\n\n## B\n\n\n\n## C\n\n");
        assert_eq!(parse_sections(&composed), list);
    }

    #[test]
    fn accepts_any_heading_level() {
        let parsed = parse_sections("# One\nfirst\n###### Six\nsixth");

        assert_eq!(parsed, sections(&[("One", "first"), ("Six", "sixth")]));
    }

    #[test]
    fn ignores_hash_runs_that_are_not_headings() {
        let body = "## Hero\n\n#brave and\n####### not a heading\n##also-not";
        let parsed = parse_sections(body);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].body, "#brave and\n####### not a heading\n##also-not");
    }

    #[test]
    fn discards_sections_with_empty_titles() {
        let parsed = parse_sections("##   \n\nlost\n\n## Kept\n\nbody");

        assert_eq!(parsed, sections(&[("Kept", "body")]));
    }

    #[test]
    fn title_is_trimmed() {
        let parsed = parse_sections("##\t  Anne Marie  \n\nbody");

        assert_eq!(parsed[0].title, "Anne Marie");
    }

    #[test]
    fn preamble_is_kept_verbatim() {
        let body = "notes before\n\n## Hero\n\nbody";
        let document = parse_document(body);

        assert_eq!(document.preamble, "notes before\n\n");
        assert_eq!(document.sections, sections(&[("Hero", "body")]));
        assert_eq!(compose_document(&document), body);
    }

    #[test]
    fn document_without_headings_is_all_preamble() {
        let document = parse_document("just text\n");

        assert_eq!(document.preamble, "just text\n");
        assert!(document.sections.is_empty());
    }

    #[test]
    fn empty_input_has_no_sections() {
        assert!(parse_sections("").is_empty());
        assert_eq!(compose_sections(&[]), "");
    }

    #[test]
    fn hand_written_heading_without_blank_line() {
        let parsed = parse_sections("## Hero\nBrave.");

        assert_eq!(parsed, sections(&[("Hero", "Brave.")]));
    }

    #[test]
    fn heading_title_rules() {
        assert_eq!(heading_title("## Hero"), Some("Hero"));
        assert_eq!(heading_title("#\tTabbed"), Some("Tabbed"));
        assert_eq!(heading_title("#hero"), None);
        assert_eq!(heading_title("####### seven"), None);
        assert_eq!(heading_title(" ## indented"), None);
        assert_eq!(heading_title("## "), Some(""));
    }

    #[test]
    fn duplicates_are_listed_in_source_order() {
        let document = parse_document("## Hero\n\nold\n\n## Hero\n\nolder");

        assert_eq!(document.sections.len(), 2);
        assert_eq!(document.find("Hero").map(|s| s.body.as_str()), Some("old"));
    }
}
