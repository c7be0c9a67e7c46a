//! Text rules for posts and comments.

use crate::domain::error::DomainError;

/// Characters of post text shown as the detail page title.
pub const TITLE_FRAGMENT_CHARS: usize = 30;
/// Characters of post text used when a post is named in logs or admin output.
pub const DISPLAY_LABEL_CHARS: usize = 15;
/// Words of post text shown on list pages.
pub const EXCERPT_WORDS: usize = 30;

const ELLIPSIS: char = '…';

pub fn title_fragment(text: &str) -> String {
    text.chars().take(TITLE_FRAGMENT_CHARS).collect()
}

pub fn display_label(text: &str) -> String {
    text.chars().take(DISPLAY_LABEL_CHARS).collect()
}

/// Truncate to [`EXCERPT_WORDS`] whitespace-separated words.
pub fn excerpt(text: &str) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(EXCERPT_WORDS).collect();
    let mut output = kept.join(" ");
    if words.next().is_some() {
        output.push(' ');
        output.push(ELLIPSIS);
    }
    output
}

/// Normalise submitted post text, rejecting blank submissions.
pub fn validate_post_text(raw: &str) -> Result<String, DomainError> {
    let normalized = raw.replace("\r\n", "\n");
    if normalized.trim().is_empty() {
        return Err(DomainError::validation("text", "post text must not be empty"));
    }
    Ok(normalized.trim_end().to_string())
}

pub fn validate_comment_text(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(
            "text",
            "comment text must not be empty",
        ));
    }
    Ok(trimmed.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_fragment_counts_characters_not_bytes() {
        let text = "Привет, это очень длинный текст для проверки заголовка";
        let fragment = title_fragment(text);
        assert_eq!(fragment.chars().count(), TITLE_FRAGMENT_CHARS);
        assert!(text.starts_with(&fragment));
    }

    #[test]
    fn short_text_is_kept_whole() {
        assert_eq!(title_fragment("short"), "short");
        assert_eq!(display_label("tiny"), "tiny");
    }

    #[test]
    fn display_label_uses_first_fifteen_characters() {
        assert_eq!(display_label("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmno");
    }

    #[test]
    fn excerpt_marks_truncation() {
        let text = (1..=40).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let out = excerpt(&text);
        assert!(out.ends_with(ELLIPSIS));
        assert_eq!(out.split_whitespace().count(), EXCERPT_WORDS + 1);
        assert_eq!(excerpt("two words"), "two words");
    }

    #[test]
    fn blank_post_text_is_rejected() {
        let err = validate_post_text("  \r\n ").expect_err("blank text");
        assert_eq!(err.field(), Some("text"));
        assert_eq!(validate_post_text("line\r\nnext\n").expect("valid"), "line\nnext");
    }

    #[test]
    fn blank_comment_is_rejected() {
        assert!(validate_comment_text("   ").is_err());
        assert_eq!(validate_comment_text(" nice ").expect("valid"), "nice");
    }
}
