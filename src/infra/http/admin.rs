//! Administrative listener: group management, cascading deletes and cache control.
//!
//! Bound to a separate address and never exposed on the public router.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        admin::{AdminService, CreateGroupCommand},
        error::HttpError,
    },
    infra::db::SqliteRepositories,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub admin: Arc<AdminService>,
    pub db: Arc<SqliteRepositories>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/{slug}", delete(delete_group))
        .route("/authors/{username}", delete(delete_author))
        .route("/posts/{id}", delete(delete_post))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/cache/invalidate/{key}", post(invalidate_cache_key))
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
struct CreateGroupForm {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetachedPosts {
    detached_posts: u64,
}

#[derive(Debug, Serialize)]
struct CacheCleared {
    removed: usize,
}

async fn create_group(
    State(state): State<AdminState>,
    Form(form): Form<CreateGroupForm>,
) -> Result<Response, HttpError> {
    let group = state
        .admin
        .create_group(CreateGroupCommand {
            title: form.title,
            slug: form.slug.filter(|slug| !slug.trim().is_empty()),
            description: form.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)).into_response())
}

async fn delete_group(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Result<Json<DetachedPosts>, HttpError> {
    let detached_posts = state.admin.delete_group(&slug).await?;
    Ok(Json(DetachedPosts { detached_posts }))
}

async fn delete_author(
    State(state): State<AdminState>,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    let deleted = state.admin.delete_author(&username).await?;
    Ok(Json(deleted).into_response())
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, HttpError> {
    let deleted = state.admin.delete_post(id).await?;
    Ok(Json(deleted).into_response())
}

async fn invalidate_cache(State(state): State<AdminState>) -> Json<CacheCleared> {
    Json(CacheCleared {
        removed: state.admin.invalidate_cache(),
    })
}

async fn invalidate_cache_key(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Response {
    if state.admin.invalidate_cache_key(&key) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        HttpError::new(
            "infra::http::admin::invalidate_cache_key",
            StatusCode::NOT_FOUND,
            "No cached entry for key",
            format!("cache key `{key}` not present"),
        )
        .into_response()
    }
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.health_check().await)
}
