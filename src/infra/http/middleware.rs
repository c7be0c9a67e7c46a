use std::{
    sync::{Arc, OnceLock},
    time::Instant,
};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const ANONYMOUS: &str = "anonymous";

/// Per-request identity shared between the logging layer and the handlers.
///
/// The viewer slot starts empty and is filled at most once, by the session
/// extractor, when a cookie resolves to an author.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    viewer: Arc<OnceLock<String>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            viewer: Arc::new(OnceLock::new()),
        }
    }

    pub fn record_viewer(&self, username: &str) {
        let _ = self.viewer.set(username.to_string());
    }

    pub fn viewer(&self) -> &str {
        self.viewer.get().map(String::as_str).unwrap_or(ANONYMOUS)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::new();
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log failed responses with the viewer and the error report the handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let elapsed_ms = start.elapsed().as_millis();
    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain.first().map(String::as_str).unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "blogroll::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            viewer = ctx.viewer(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = detail,
            chain = ?chain,
            request_id = %ctx.request_id,
            "request failed",
        );
    } else {
        warn!(
            target = "blogroll::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            viewer = ctx.viewer(),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = detail,
            request_id = %ctx.request_id,
            "client request error",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, extract::Extension, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn viewer_defaults_to_anonymous_and_is_set_once() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.viewer(), "anonymous");

        ctx.record_viewer("leo");
        ctx.clone().record_viewer("mia");
        assert_eq!(ctx.viewer(), "leo");
    }

    #[tokio::test]
    async fn viewer_recorded_by_a_handler_reaches_the_response_context() {
        let app = Router::new()
            .route(
                "/",
                get(|Extension(ctx): Extension<RequestContext>| async move {
                    ctx.record_viewer("leo");
                    "ok"
                }),
            )
            .layer(middleware::from_fn(log_responses))
            .layer(middleware::from_fn(set_request_context));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        let ctx = response
            .extensions()
            .get::<RequestContext>()
            .expect("context attached");
        assert_eq!(ctx.viewer(), "leo");
        assert!(!ctx.request_id.is_empty());
    }
}
