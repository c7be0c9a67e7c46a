use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        admin::AdminError, auth::AuthError, feed::FeedError, follow::FollowError,
        posts::PostError, repos::RepoError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Carry the diagnostic report on a response built elsewhere, such as a rendered error page.
    pub fn attach_to(self, response: &mut Response) {
        self.report.attach(response);
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

const FEED_SOURCE: &str = "application::error::feed_error";
const POST_SOURCE: &str = "application::error::post_error";
const FOLLOW_SOURCE: &str = "application::error::follow_error";
const AUTH_SOURCE: &str = "application::error::auth_error";
const ADMIN_SOURCE: &str = "application::error::admin_error";

fn internal(source: &'static str, error: &dyn StdError) -> HttpError {
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        error,
    )
}

fn repo_failure(source: &'static str, error: &RepoError) -> HttpError {
    match error {
        RepoError::Timeout => HttpError::from_error(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            error,
        ),
        RepoError::NotFound => {
            HttpError::from_error(source, StatusCode::NOT_FOUND, "Not found", error)
        }
        _ => internal(source, error),
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        match &error {
            FeedError::UnknownGroup(_)
            | FeedError::UnknownAuthor(_)
            | FeedError::UnknownPost(_) => {
                HttpError::from_error(FEED_SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            FeedError::Unauthorized => HttpError::from_error(
                FEED_SOURCE,
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                &error,
            ),
            FeedError::Repo(err) => repo_failure(FEED_SOURCE, err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        match &error {
            PostError::UnknownPost(_) => {
                HttpError::from_error(POST_SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            PostError::Forbidden { .. } => {
                HttpError::from_error(POST_SOURCE, StatusCode::FORBIDDEN, "Forbidden", &error)
            }
            PostError::Validation(_) => HttpError::from_error(
                POST_SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            PostError::Storage(_) => internal(POST_SOURCE, &error),
            PostError::Repo(err) => repo_failure(POST_SOURCE, err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        match &error {
            FollowError::UnknownAuthor(_) => {
                HttpError::from_error(FOLLOW_SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            FollowError::Repo(err) => repo_failure(FOLLOW_SOURCE, err),
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        match &error {
            AuthError::Validation(_) | AuthError::InvalidCredentials => HttpError::from_error(
                AUTH_SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                &error,
            ),
            AuthError::Hashing(_) => internal(AUTH_SOURCE, &error),
            AuthError::Repo(err) => repo_failure(AUTH_SOURCE, err),
        }
    }
}

impl From<AdminError> for HttpError {
    fn from(error: AdminError) -> Self {
        match &error {
            AdminError::InvalidTitle | AdminError::Slug(_) => HttpError::from_error(
                ADMIN_SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid group",
                &error,
            ),
            AdminError::DuplicateSlug(_) => HttpError::from_error(
                ADMIN_SOURCE,
                StatusCode::CONFLICT,
                "Group slug already exists",
                &error,
            ),
            AdminError::NotFound(_) => {
                HttpError::from_error(ADMIN_SOURCE, StatusCode::NOT_FOUND, "Not found", &error)
            }
            AdminError::Repo(err) => repo_failure(ADMIN_SOURCE, err),
        }
    }
}

/// Top-level failure of the binary: startup, migrations or a serving loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_report_collects_the_source_chain() {
        let error = FeedError::Repo(RepoError::Timeout);
        let report = ErrorReport::from_error("test", StatusCode::SERVICE_UNAVAILABLE, &error);
        assert_eq!(report.messages, vec!["database timeout".to_string()]);

        let error = PostError::Storage(crate::infra::uploads::UploadStorageError::NotAnImage);
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(
            report.messages,
            vec![
                "failed to store image".to_string(),
                "uploaded file is not a recognised image".to_string()
            ]
        );
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let cases: Vec<(HttpError, StatusCode)> = vec![
            (
                FeedError::UnknownGroup("tech".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (FeedError::Unauthorized.into(), StatusCode::UNAUTHORIZED),
            (
                FeedError::Repo(RepoError::Timeout).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PostError::Forbidden {
                    post_id: 1,
                    author_id: 2,
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (
                FollowError::UnknownAuthor("ghost".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (AuthError::InvalidCredentials.into(), StatusCode::BAD_REQUEST),
            (
                AdminError::DuplicateSlug("tech".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                AdminError::Repo(RepoError::from_persistence("disk full")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected);
        }
    }
}
