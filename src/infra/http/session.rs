//! Cookie sessions and the extractors that resolve them to authors.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::application::auth::IssuedSession;
use crate::domain::entities::AuthorRef;

use super::{middleware::RequestContext, public::HttpState};

pub const SESSION_COOKIE: &str = "blogroll_session";

const LOGIN_PATH: &str = "/auth/login/";

/// The signed-in author, if any. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct CurrentViewer(pub Option<AuthorRef>);

impl CurrentViewer {
    pub fn author(&self) -> Option<&AuthorRef> {
        self.0.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|author| author.username.as_str())
    }
}

impl<S> FromRequestParts<S> for CurrentViewer
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = HttpState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string()) else {
            return Ok(Self(None));
        };

        match state.auth.authenticate(&token).await {
            Ok(author) => {
                if let Some(ctx) = parts.extensions.get::<RequestContext>() {
                    ctx.record_viewer(&author.username);
                }
                Ok(Self(Some(AuthorRef::from(&author))))
            }
            Err(err) => {
                debug!(
                    target = "blogroll::http::session",
                    error = %err,
                    "ignoring session cookie"
                );
                Ok(Self(None))
            }
        }
    }
}

/// A signed-in author. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct RequireAuthor(pub AuthorRef);

impl<S> FromRequestParts<S> for RequireAuthor
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentViewer(viewer) = match CurrentViewer::from_request_parts(parts, state).await {
            Ok(viewer) => viewer,
            Err(never) => match never {},
        };
        match viewer {
            Some(author) => Ok(Self(author)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(login_redirect(next))
            }
        }
    }
}

/// `/auth/login/?next=<path>`, keeping path separators readable.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/"))
}

pub fn login_redirect(next: &str) -> Response {
    Redirect::to(&login_url(next)).into_response()
}

/// Accept only same-site absolute paths as post-login destinations.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then_some(next)
}

pub fn session_cookie(session: &IssuedSession, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .expires(session.expires_at)
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
