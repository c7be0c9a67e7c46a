//! Username and password rules for author accounts.

use crate::domain::error::DomainError;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Usernames are case-sensitive and limited to letters, digits and `@.+-_`.
pub fn validate_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username", "username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("username must be at most {MAX_USERNAME_LEN} characters"),
        ));
    }
    let allowed = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !allowed {
        return Err(DomainError::validation(
            "username",
            "username may only contain letters, digits and @/./+/-/_",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password1",
            format!("password must contain at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation(
            "password1",
            "password must not be entirely numeric",
        ));
    }
    if password != confirmation {
        return Err(DomainError::validation(
            "password2",
            "the two password fields did not match",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed() {
        assert_eq!(validate_username("  leo ").expect("valid"), "leo");
    }

    #[test]
    fn username_rejects_spaces_and_symbols() {
        assert!(validate_username("two words").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("a.b+c-d_e@f").is_ok());
    }

    #[test]
    fn password_rules() {
        assert_eq!(
            validate_new_password("short", "short").expect_err("too short").field(),
            Some("password1")
        );
        assert!(validate_new_password("12345678", "12345678").is_err());
        assert_eq!(
            validate_new_password("correct horse", "correct house")
                .expect_err("mismatch")
                .field(),
            Some("password2")
        );
        assert!(validate_new_password("correct horse", "correct horse").is_ok());
    }
}
