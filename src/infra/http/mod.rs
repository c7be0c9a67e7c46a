mod accounts;
mod admin;
mod middleware;
mod posts;
mod public;
mod session;

pub use admin::{AdminState, build_admin_router};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
pub use session::{CurrentViewer, RequireAuthor, SESSION_COOKIE};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::{
    admin::AdminService, auth::AuthService, error::ErrorReport, feed::FeedService,
    follow::FollowService, posts::PostService,
};
use crate::cache::PageCache;
use crate::infra::{db::SqliteRepositories, uploads::UploadStorage};

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Knobs the HTTP surfaces need beyond the repositories.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub session_ttl: time::Duration,
    pub cookie_secure: bool,
    pub upload_limit_bytes: usize,
}

/// Wire every service onto one set of repositories and return the public and admin states.
pub fn build_states(
    db: Arc<SqliteRepositories>,
    uploads: Arc<UploadStorage>,
    cache: PageCache,
    options: ServiceOptions,
) -> (HttpState, AdminState) {
    let follows = FollowService::new(db.clone(), db.clone());
    let feed = FeedService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        follows.clone(),
    );
    let posts = PostService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        uploads.clone(),
    );
    let auth = AuthService::new(db.clone(), db.clone(), options.session_ttl);
    let admin = AdminService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        uploads.clone(),
        cache.clone(),
    );

    let http = HttpState {
        feed: Arc::new(feed),
        follows: Arc::new(follows),
        posts: Arc::new(posts),
        auth: Arc::new(auth),
        cache,
        db: db.clone(),
        upload_storage: uploads,
        cookie_secure: options.cookie_secure,
        upload_limit_bytes: options.upload_limit_bytes,
    };
    let admin = AdminState {
        admin: Arc::new(admin),
        db,
    };
    (http, admin)
}
