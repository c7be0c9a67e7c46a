use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        auth::AuthService,
        error::HttpError,
        feed::{FeedError, FeedService},
        follow::{FollowError, FollowService},
        pagination::PageRequest,
        posts::PostService,
    },
    cache::{PageCache, home_page_key},
    domain::entities::AuthorRef,
    infra::{
        db::SqliteRepositories,
        uploads::{UploadStorage, UploadStorageError},
    },
    presentation::views::{
        FeedPageView, FeedView, FollowTemplate, GroupPageView, GroupTemplate, IndexTemplate,
        LayoutChrome, LayoutContext, PostDetailTemplate, PostDetailView, ProfileTemplate,
        ProfileView, profile_href, render_not_found_for, render_not_found_response,
        render_template, render_template_response,
    },
};

use super::{
    accounts, db_health_response,
    middleware::{log_responses, set_request_context},
    posts,
    session::{CurrentViewer, RequireAuthor},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    pub auth: Arc<AuthService>,
    pub cache: PageCache,
    pub db: Arc<SqliteRepositories>,
    pub upload_storage: Arc<UploadStorage>,
    pub cookie_secure: bool,
    pub upload_limit_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let authoring = Router::new()
        .route(
            "/create/",
            get(posts::create_form).post(posts::create_submit),
        )
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes));

    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_index))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", post(follow_author))
        .route("/profile/{username}/unfollow/", post(unfollow_author))
        .route("/follow/", get(following))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route("/auth/logout/", post(accounts::logout))
        .route("/media/{*path}", get(serve_upload))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/_health/db", get(public_health))
        .merge(authoring)
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref())
    }
}

async fn index(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let request = query.request();
    let config = state.cache.config();
    let key = home_page_key(&config.key_prefix, request, viewer.username());
    let ttl = config.home_ttl();

    let rendered = state
        .cache
        .get_or_compute(&key, ttl, || render_home(&state, viewer.author(), request))
        .await;

    match rendered {
        Ok(body) => Html(body).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn render_home(
    state: &HttpState,
    viewer: Option<&AuthorRef>,
    request: PageRequest,
) -> Result<Bytes, HttpError> {
    let page = state.feed.home(request).await?;
    let content = FeedPageView {
        heading: "Latest posts".to_string(),
        feed: FeedView::new("/", &page, "No posts yet."),
    };
    let view = LayoutContext::new(LayoutChrome::new(viewer, "Home"), content);
    let Html(body) = render_template(IndexTemplate { view })?;
    Ok(Bytes::from(body))
}

async fn group_index(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group(&slug, query.request()).await {
        Ok(group_feed) => {
            let chrome = LayoutChrome::new(viewer.author(), group_feed.group.title.clone());
            let view = LayoutContext::new(chrome, GroupPageView::from(&group_feed));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .profile(&username, query.request(), viewer.author())
        .await
    {
        Ok(profile) => {
            let chrome = LayoutChrome::new(viewer.author(), profile.author.username.clone());
            let view = LayoutContext::new(chrome, ProfileView::from(&profile));
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn following(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.following(Some(&author), query.request()).await {
        Ok(page) => {
            let content = FeedPageView {
                heading: "Following".to_string(),
                feed: FeedView::new(
                    "/follow/",
                    &page,
                    "Nothing here yet. Follow authors to see their posts.",
                ),
            };
            let view = LayoutContext::new(LayoutChrome::new(Some(&author), "Following"), content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &CurrentViewer(Some(author))),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(LayoutChrome::new(viewer.author(), "Not found"));
    };

    match state.feed.post_detail(id, viewer.author()).await {
        Ok(detail) => {
            let chrome = LayoutChrome::new(viewer.author(), detail.title_fragment.clone());
            let view = LayoutContext::new(chrome, PostDetailView::new(&detail, viewer.0.is_some()));
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn follow_author(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&author, &username).await {
        Ok(change) => Redirect::to(&profile_href(&change.target.username)).into_response(),
        Err(err) => follow_error_to_response(err, &author),
    }
}

async fn unfollow_author(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&author, &username).await {
        Ok(change) => Redirect::to(&profile_href(&change.target.username)).into_response(),
        Err(err) => follow_error_to_response(err, &author),
    }
}

async fn serve_upload(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Upload not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Upload not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback_router(viewer: CurrentViewer) -> Response {
    render_not_found_response(LayoutChrome::new(viewer.author(), "Not found"))
}

/// Numeric ids only; anything else is treated as an unknown post.
pub(super) fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn feed_error_to_response(err: FeedError, viewer: &CurrentViewer) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
            render_not_found_for(LayoutChrome::new(viewer.author(), "Not found"), err.into())
        }
        other => HttpError::from(other).into_response(),
    }
}

fn follow_error_to_response(err: FollowError, viewer: &AuthorRef) -> Response {
    match err {
        FollowError::UnknownAuthor(_) => {
            render_not_found_for(LayoutChrome::new(Some(viewer), "Not found"), err.into())
        }
        other => HttpError::from(other).into_response(),
    }
}
