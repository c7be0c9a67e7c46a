//! Signup, login and logout.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        auth::{AuthError, SignupInput},
        error::HttpError,
    },
    domain::error::DomainError,
    presentation::views::{
        LayoutChrome, LayoutContext, LoginTemplate, LoginView, SignupTemplate, SignupView,
        render_template_response,
    },
};

use super::{
    public::HttpState,
    session::{CurrentViewer, SESSION_COOKIE, clear_session_cookie, safe_next, session_cookie},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupForm {
    username: String,
    password1: String,
    password2: String,
}

pub(super) async fn login_form(viewer: CurrentViewer, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).unwrap_or_default();
    if viewer.0.is_some() {
        return Redirect::to(if next.is_empty() { "/" } else { next }).into_response();
    }

    render_login(LoginView {
        next: next.to_string(),
        ..LoginView::default()
    })
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).unwrap_or("/").to_string();

    match state.auth.login(&form.username, &form.password).await {
        Ok(signed_in) => {
            let jar = jar.add(session_cookie(&signed_in.session, state.cookie_secure));
            (jar, Redirect::to(&next)).into_response()
        }
        Err(AuthError::InvalidCredentials) => render_login(LoginView {
            username: form.username.trim().to_string(),
            next: safe_next(form.next.as_deref())
                .unwrap_or_default()
                .to_string(),
            error: "Please enter a correct username and password.".to_string(),
        }),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn signup_form(viewer: CurrentViewer) -> Response {
    if viewer.0.is_some() {
        return Redirect::to("/").into_response();
    }
    render_signup(SignupView::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let input = SignupInput {
        username: form.username.clone(),
        password1: form.password1,
        password2: form.password2,
    };

    match state.auth.signup(input).await {
        Ok(signed_in) => {
            let jar = jar.add(session_cookie(&signed_in.session, state.cookie_secure));
            (jar, Redirect::to("/")).into_response()
        }
        Err(AuthError::Validation(err)) => {
            let message = match &err {
                DomainError::Validation { message, .. } => message.clone(),
                other => other.to_string(),
            };
            let field = err.field().unwrap_or("username");
            render_signup(SignupView::with_error(form.username.trim(), field, &message))
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.auth.logout(cookie.value()).await
    {
        warn!(
            target = "blogroll::http::accounts",
            error = %err,
            "failed to revoke session on logout"
        );
    }
    (clear_session_cookie(jar), Redirect::to("/")).into_response()
}

fn render_login(content: LoginView) -> Response {
    let view = LayoutContext::new(LayoutChrome::new(None, "Log in"), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_signup(content: SignupView) -> Response {
    let view = LayoutContext::new(LayoutChrome::new(None, "Sign up"), content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}
