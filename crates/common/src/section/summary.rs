// Hover-card data for an entity: its image and a one-line summary.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Section;

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("image pattern should compile")
    })
}

fn image_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^!\[.*\]\(.*\)$").expect("image line pattern should compile"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySummary {
    pub title: String,
    /// URL of the first markdown image in the body.
    pub image: Option<String>,
    /// First non-empty line that is not an image on its own.
    pub summary: Option<String>,
}

impl EntitySummary {
    pub fn from_section(section: &Section) -> Self {
        Self {
            title: section.title.clone(),
            image: first_image_url(&section.body).map(str::to_string),
            summary: first_text_line(&section.body).map(str::to_string),
        }
    }

    /// Fill in `image` from a fallback list when the body has none.
    pub fn with_fallback_image(mut self, images: &[String]) -> Self {
        if self.image.is_none() {
            self.image = images.first().cloned();
        }
        self
    }
}

pub fn first_image_url(body: &str) -> Option<&str> {
    image_pattern().captures(body).and_then(|caps| caps.get(2)).map(|url| url.as_str())
}

fn first_text_line(body: &str) -> Option<&str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| !image_line_pattern().is_match(line))
}
