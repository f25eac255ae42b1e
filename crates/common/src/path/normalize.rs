// Name sanitisation: NFC normalization, reserved-character replacement,
// traversal rejection, 255 char max.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Maximum allowed name length in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Characters that may not appear in a stored name.
const RESERVED: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("name is empty")]
    Empty,

    #[error("name exceeds maximum length of {MAX_NAME_CHARS} characters")]
    TooLong,

    #[error("name is a directory traversal component: {0}")]
    Traversal(String),

    #[error("name contains null byte")]
    NullByte,
}

/// Turn arbitrary user input into a single safe path component.
///
/// Applies NFC, replaces each reserved character with `-`, trims
/// surrounding whitespace, then validates the result.
pub fn safe_name(input: &str) -> Result<String, PathError> {
    let normalized: String = input.nfc().collect();
    let replaced: String = normalized
        .chars()
        .map(|ch| if RESERVED.contains(&ch) { '-' } else { ch })
        .collect();
    let name = replaced.trim().to_string();
    validate_name(&name)?;
    Ok(name)
}

/// Check that `name` can be used verbatim as one directory entry.
pub fn validate_name(name: &str) -> Result<(), PathError> {
    if name.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if name.contains('\0') {
        return Err(PathError::NullByte);
    }
    if name == "." || name == ".." {
        return Err(PathError::Traversal(name.to_string()));
    }
    if name.contains(RESERVED) {
        return Err(PathError::Traversal(name.to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(PathError::TooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_is_kept() {
        assert_eq!(safe_name("The Long Winter").unwrap(), "The Long Winter");
    }

    #[test]
    fn reserved_characters_become_dashes() {
        assert_eq!(safe_name("a/b\\c?d%e*f:g|h\"i<j>k").unwrap(), "a-b-c-d-e-f-g-h-i-j-k");
    }

    #[test]
    fn separators_cannot_escape_the_root() {
        assert_eq!(safe_name("../../etc/passwd").unwrap(), "..-..-etc-passwd");
    }

    #[test]
    fn nfc_composes_combining_marks() {
        let decomposed = safe_name("caf\u{0065}\u{0301}").unwrap();

        assert_eq!(decomposed, "café");
        assert_eq!(decomposed.chars().count(), 4);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(safe_name("  Hero.png \n").unwrap(), "Hero.png");
    }

    #[test]
    fn reject_empty() {
        assert_eq!(safe_name(""), Err(PathError::Empty));
        assert_eq!(safe_name("   "), Err(PathError::Empty));
    }

    #[test]
    fn reject_dot_components() {
        assert_eq!(safe_name(".."), Err(PathError::Traversal("..".to_string())));
        assert_eq!(validate_name("."), Err(PathError::Traversal(".".to_string())));
    }

    #[test]
    fn reject_null_byte() {
        assert_eq!(safe_name("bad\0name"), Err(PathError::NullByte));
    }

    #[test]
    fn validate_rejects_unsanitised_separators() {
        assert_eq!(validate_name("a/b"), Err(PathError::Traversal("a/b".to_string())));
    }

    #[test]
    fn max_length_exactly() {
        assert!(safe_name(&"a".repeat(MAX_NAME_CHARS)).is_ok());
        assert_eq!(safe_name(&"a".repeat(MAX_NAME_CHARS + 1)), Err(PathError::TooLong));
    }
}
