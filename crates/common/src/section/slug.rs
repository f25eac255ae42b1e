// Entity anchor slugs.
//
// Slugs: lowercase, alphanumerics of any script kept, every other run of
// characters collapsed into one hyphen. Anchors: `entity-{slug}`.

/// Prefix of every entity anchor id.
const ANCHOR_PREFIX: &str = "entity";

/// Convert an entity title into a URL-fragment-safe slug.
///
/// Returns an empty string if the title contains no alphanumeric characters.
pub fn slugify(title: &str) -> String {
    let raw: String = title
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|ch| if ch.is_alphanumeric() { ch } else { '-' })
        .collect();

    raw.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-")
}

/// Fragment id used to link an annotated mention to its entity section.
pub fn entity_anchor(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        ANCHOR_PREFIX.to_string()
    } else {
        format!("{ANCHOR_PREFIX}-{slug}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Anne Marie"), "anne-marie");
    }

    #[test]
    fn slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("Dr. Who?! (the 2nd)"), "dr-who-the-2nd");
        assert_eq!(slugify("  spaced  out  "), "spaced-out");
    }

    #[test]
    fn slugify_keeps_non_ascii_letters() {
        assert_eq!(slugify("Élodie Brontë"), "élodie-brontë");
        assert_eq!(slugify("東京"), "東京");
    }

    #[test]
    fn slugify_returns_empty_for_no_alphanumeric() {
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn anchor_prefixes_slug() {
        assert_eq!(entity_anchor("The Old Mill"), "entity-the-old-mill");
        assert_eq!(entity_anchor("!!!"), "entity");
    }
}
