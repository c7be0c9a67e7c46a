#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use blogroll::{
    application::repos::{CreateGroupParams, CreatePostParams, GroupsRepo, PostsWriteRepo},
    cache::{ManualClock, PageCache, PageCacheConfig},
    domain::entities::{GroupRecord, PostRecord},
    infra::{
        db::SqliteRepositories,
        http::{ServiceOptions, build_admin_router, build_router, build_states},
        uploads::UploadStorage,
    },
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";
const BOUNDARY: &str = "blogroll-test-boundary";

pub struct TestApp {
    pub public: Router,
    pub admin: Router,
    pub db: Arc<SqliteRepositories>,
    pub cache: PageCache,
    pub clock: Arc<ManualClock>,
    pub uploads: Arc<UploadStorage>,
    _upload_dir: TempDir,
}

pub struct SignedInAuthor {
    pub id: i64,
    pub username: String,
    pub cookie: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(
            SqliteRepositories::in_memory()
                .await
                .expect("in-memory database should open"),
        );
        let upload_dir = tempfile::tempdir().expect("temp dir should be created");
        let uploads = Arc::new(
            UploadStorage::new(upload_dir.path().to_path_buf()).expect("upload storage"),
        );
        let clock = Arc::new(ManualClock::new());
        let cache = PageCache::with_clock(PageCacheConfig::default(), clock.clone());
        let (http_state, admin_state) = build_states(
            db.clone(),
            uploads.clone(),
            cache.clone(),
            ServiceOptions {
                session_ttl: time::Duration::hours(1),
                cookie_secure: false,
                upload_limit_bytes: 1024 * 1024,
            },
        );

        Self {
            public: build_router(http_state),
            admin: build_admin_router(admin_state),
            db,
            cache,
            clock,
            uploads,
            _upload_dir: upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.public
            .clone()
            .oneshot(request)
            .await
            .expect("public router should respond")
    }

    pub async fn send_admin(&self, request: Request<Body>) -> Response {
        self.admin
            .clone()
            .oneshot(request)
            .await
            .expect("admin router should respond")
    }

    pub async fn get_page(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, String) {
        let response = self.send(get(uri, cookie)).await;
        let status = response.status();
        (status, body_text(response).await)
    }

    /// Sign up through the public form and return the session cookie.
    pub async fn signup(&self, username: &str) -> SignedInAuthor {
        let body = format!("username={username}&password1={PASSWORD}&password2={PASSWORD}")
            .replace(' ', "+");
        let response = self.send(post_form("/auth/signup/", &body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "signup should redirect");
        let cookie = session_cookie(&response).expect("signup should set a session cookie");

        let author = blogroll::application::repos::AuthorsRepo::find_author_by_username(
            self.db.as_ref(),
            username,
        )
        .await
        .expect("author lookup")
        .expect("author should exist after signup");

        SignedInAuthor {
            id: author.id,
            username: username.to_string(),
            cookie,
        }
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.db
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: Some(format!("All about {title}")),
            })
            .await
            .expect("group should be created")
    }

    /// Insert posts directly, one second apart so the newest is unambiguous.
    pub async fn seed_posts(
        &self,
        author_id: i64,
        group_id: Option<i64>,
        count: usize,
    ) -> Vec<PostRecord> {
        let start = OffsetDateTime::now_utc() - time::Duration::hours(1);
        let mut posts = Vec::with_capacity(count);
        for index in 0..count {
            let post = self
                .db
                .create_post(CreatePostParams {
                    author_id,
                    text: format!("Seeded post number {index}"),
                    group_id,
                    image_path: None,
                    created_at: start + time::Duration::seconds(index as i64),
                })
                .await
                .expect("post should be created");
            posts.push(post);
        }
        posts
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method(Method::GET).uri(uri), cookie)
        .body(Body::empty())
        .expect("request should build")
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

pub fn post_empty(uri: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method(Method::POST).uri(uri), cookie)
        .body(Body::empty())
        .expect("request should build")
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method(Method::POST).uri(uri), cookie)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

/// Build a multipart body from text fields plus an optional `image` file part.
pub fn post_multipart(
    uri: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    with_cookie(Request::builder().method(Method::POST).uri(uri), cookie)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}

fn with_cookie(
    builder: axum::http::request::Builder,
    cookie: Option<&str>,
) -> axum::http::request::Builder {
    match cookie {
        Some(cookie) => builder.header(COOKIE, cookie),
        None => builder,
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` pair of the session cookie set by a response.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("blogroll_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn count_cards(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}

/// Smallest valid GIF: a 1x1 transparent pixel.
pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];
