//! Group slug derivation and validation.
//!
//! Slugs are the public identifier of a group (`/group/<slug>/`). They are
//! either supplied by an administrator or derived from the group title with
//! the `slug` crate.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug must be at most {MAX_SLUG_LEN} characters")]
    TooLong,
    #[error("slug `{slug}` may only contain lowercase letters, digits, `-` and `_`")]
    InvalidCharacters { slug: String },
}

/// Derive a slug from human-readable text such as a group title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Validate a slug supplied verbatim.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    let valid = slug
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if !valid {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_joins_words() {
        assert_eq!(derive_slug("Rust Tips & Tricks").expect("slug"), "rust-tips-tricks");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn derive_slug_caps_length() {
        let long = "word ".repeat(100);
        let slug = derive_slug(&long).expect("slug");
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validate_slug_accepts_underscores() {
        assert!(validate_slug("slug_slug").is_ok());
        assert!(validate_slug("tech").is_ok());
    }

    #[test]
    fn validate_slug_rejects_uppercase_and_spaces() {
        assert!(matches!(
            validate_slug("Tech News"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert_eq!(validate_slug(""), Err(SlugError::EmptyInput));
    }
}
