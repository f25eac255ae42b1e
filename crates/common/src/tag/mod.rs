// Tag tokens (`#[A-Za-z0-9_-]+`) and their deterministic display colors.
//
// A tag's color is a pure function of the token string: the same tag renders
// identically in every session without anything being stored.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::{MatchKind, TagColor, TextMatch};

const BACKGROUND_SATURATION: u8 = 60;
const BACKGROUND_LIGHTNESS: u8 = 85;
const FOREGROUND_SATURATION: u8 = 55;
const FOREGROUND_LIGHTNESS: u8 = 28;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([A-Za-z0-9_-]+)").expect("tag pattern should compile"))
}

/// Order-sensitive 31-multiplier hash over UTF-16 code units, with 32-bit
/// signed wrap-around, folded to its absolute value.
pub fn hash_tag(tag: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in tag.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}

/// Color pair for a tag token. Case-sensitive: `Hero` and `hero` differ.
pub fn color_of(tag: &str) -> TagColor {
    let hue = (hash_tag(tag) % 360) as u16;
    TagColor {
        hue,
        background: format!("hsl({hue}, {BACKGROUND_SATURATION}%, {BACKGROUND_LIGHTNESS}%)"),
        foreground: format!("hsl({hue}, {FOREGROUND_SATURATION}%, {FOREGROUND_LIGHTNESS}%)"),
    }
}

/// All distinct tags in `text`, without the leading `#`, sorted.
pub fn extract_tags(text: &str) -> BTreeSet<String> {
    tag_pattern().captures_iter(text).map(|caps| caps[1].to_string()).collect()
}

/// The first tag in text order, if any.
pub fn first_tag(text: &str) -> Option<String> {
    tag_pattern().captures(text).map(|caps| caps[1].to_string())
}

/// Every `#tag` occurrence in `text` as a colored tag match.
pub fn tag_spans(text: &str) -> Vec<TextMatch> {
    tag_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = caps.get(1)?.as_str();
            Some(TextMatch {
                start: whole.start(),
                end: whole.end(),
                text: whole.as_str().to_string(),
                key: tag.to_string(),
                kind: MatchKind::Tag,
                color: Some(color_of(tag)),
            })
        })
        .collect()
}
