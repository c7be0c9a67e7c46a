//! Author accounts and cookie sessions.

use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::repos::{
    AuthorsRepo, CreateAuthorParams, CreateSessionParams, RepoError, SessionsRepo,
};
use crate::domain::accounts::{validate_new_password, validate_username};
use crate::domain::entities::AuthorRecord;
use crate::domain::error::DomainError;

const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session token")]
    Invalid,
    #[error("expired session")]
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// A freshly issued session; `token` is only ever known to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub author: AuthorRecord,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct AuthService {
    authors: Arc<dyn AuthorsRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        authors: Arc<dyn AuthorsRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            authors,
            sessions,
            session_ttl,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> Result<SignedIn, AuthError> {
        let username = validate_username(&input.username)?;
        validate_new_password(&input.password1, &input.password2)?;

        if self.authors.find_author_by_username(&username).await?.is_some() {
            return Err(username_taken().into());
        }

        let password_hash = hash_password(&input.password1)?;
        let author = match self
            .authors
            .create_author(CreateAuthorParams {
                username,
                password_hash,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
        {
            Ok(author) => author,
            Err(RepoError::Duplicate { .. }) => return Err(username_taken().into()),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "blogroll::application::auth",
            author = %author.username,
            "author signed up"
        );

        let session = self.issue_session(&author).await?;
        Ok(SignedIn { author, session })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SignedIn, AuthError> {
        let author = self
            .authors
            .find_author_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &author.password_hash) {
            debug!(
                target = "blogroll::application::auth",
                author = %author.username,
                "password mismatch"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(&author).await?;
        info!(
            target = "blogroll::application::auth",
            author = %author.username,
            "author logged in"
        );
        Ok(SignedIn { author, session })
    }

    /// Revoke the session behind `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(());
        };
        if let Some(record) = self.sessions.find_session_by_prefix(parsed.prefix).await?
            && secret_matches(&record.hashed_secret, parsed.secret)
        {
            self.sessions.delete_session(record.id).await?;
        }
        Ok(())
    }

    /// Resolve a session token to its author.
    pub async fn authenticate(&self, token: &str) -> Result<AuthorRecord, SessionError> {
        let parsed = parse_token(token).ok_or(SessionError::Invalid)?;
        let record = self
            .sessions
            .find_session_by_prefix(parsed.prefix)
            .await
            .map_err(|_| SessionError::Invalid)?
            .ok_or(SessionError::Invalid)?;

        if !secret_matches(&record.hashed_secret, parsed.secret) {
            return Err(SessionError::Invalid);
        }

        if record.expires_at <= OffsetDateTime::now_utc() {
            if let Err(err) = self.sessions.delete_session(record.id).await {
                warn!(
                    target = "blogroll::application::auth",
                    error = %err,
                    "failed to remove expired session"
                );
            }
            return Err(SessionError::Expired);
        }

        self.authors
            .find_author_by_id(record.author_id)
            .await
            .map_err(|_| SessionError::Invalid)?
            .ok_or(SessionError::Invalid)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let removed = self
            .sessions
            .delete_expired_sessions(OffsetDateTime::now_utc())
            .await?;
        if removed > 0 {
            info!(
                target = "blogroll::application::auth",
                removed, "purged expired sessions"
            );
        }
        Ok(removed)
    }

    async fn issue_session(&self, author: &AuthorRecord) -> Result<IssuedSession, AuthError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let created_at = OffsetDateTime::now_utc();
        let expires_at = created_at + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                author_id: author.id,
                prefix: prefix.clone(),
                hashed_secret: hash_secret(&secret),
                created_at,
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            token: format!("{prefix}_{secret}"),
            expires_at,
        })
    }
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn username_taken() -> DomainError {
    DomainError::validation("username", "a user with that username already exists")
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let (prefix, secret) = token.split_once('_')?;
    if prefix.len() != PREFIX_LEN || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken { prefix, secret })
}

fn secret_matches(stored: &[u8], secret: &str) -> bool {
    stored.ct_eq(&hash_secret(secret)).unwrap_u8() == 1
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not a phc string"));
    }

    #[test]
    fn generated_tokens_parse() {
        let token = format!("{}_{}", generate_prefix(), generate_secret());
        let parsed = parse_token(&token).expect("token parses");
        assert_eq!(parsed.prefix.len(), PREFIX_LEN);
        assert!(secret_matches(&hash_secret(parsed.secret), parsed.secret));
        assert!(!secret_matches(&hash_secret("other"), parsed.secret));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(parse_token("").is_none());
        assert!(parse_token("no-separator").is_none());
        assert!(parse_token("short_secret").is_none());
    }
}
