//! URL-safe slugs derived from a record's name field.

use crate::error::AppError;
use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator regex"));

/// Transliterate `source` to ASCII, lowercase it and collapse every run of characters
/// outside `[a-z0-9]` into one `-`. Leading and trailing separators are dropped.
pub fn slugify(source: &str) -> String {
    let lowered = deunicode(source).to_lowercase();
    SEPARATOR_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Slug for `field`, rejecting sources that leave nothing URL-safe behind.
pub fn derive_slug(field: &str, source: &str) -> Result<String, AppError> {
    let slug = slugify(source);
    if slug.is_empty() {
        return Err(AppError::validation(
            field,
            "must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_and_spaces_become_hyphens() {
        assert_eq!(slugify("john_doe"), "john-doe");
        assert_eq!(slugify("Complete project"), "complete-project");
    }

    #[test]
    fn runs_collapse_and_edges_trim() {
        assert_eq!(slugify("  Hello,  World!! "), "hello-world");
        assert_eq!(slugify("--a__b--"), "a-b");
    }

    #[test]
    fn non_ascii_letters_are_transliterated() {
        assert_eq!(slugify("Test API v2"), "test-api-v2");
        assert_eq!(slugify("café"), "cafe");
        assert_eq!(slugify("Иван Петров"), "ivan-petrov");
        assert_eq!(derive_slug("title", "Сделать задачу").unwrap(), "sdelat-zadachu");
    }

    #[test]
    fn empty_slug_is_a_validation_error() {
        match derive_slug("username", "!!!!") {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "username"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
