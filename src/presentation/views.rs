use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, PostDetail, ProfileFeed};
use crate::application::pagination::{Page, PageWindow};
use crate::domain::entities::{AuthorRef, CommentRecord, GroupRecord, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    OffsetDateTime, format_description::BorrowedFormatItem, format_description::well_known::Rfc3339,
    macros::format_description,
};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render the 404 page while keeping the diagnostic of the error that caused it.
pub fn render_not_found_for(chrome: LayoutChrome, error: HttpError) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    error.attach_to(&mut response);
    response
}

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year] [hour]:[minute]");

fn display_time(at: OffsetDateTime) -> String {
    at.format(DISPLAY_FORMAT).unwrap_or_default()
}

fn iso_time(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn media_href(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

#[derive(Clone, Default)]
pub struct ViewerView {
    pub signed_in: bool,
    pub username: String,
    pub profile_href: String,
}

impl ViewerView {
    pub fn from_author(viewer: Option<&AuthorRef>) -> Self {
        match viewer {
            Some(author) => Self {
                signed_in: true,
                username: author.username.clone(),
                profile_href: profile_href(&author.username),
            },
            None => Self::default(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub viewer: ViewerView,
    pub page_title: String,
}

impl LayoutChrome {
    pub fn new(viewer: Option<&AuthorRef>, page_title: impl Into<String>) -> Self {
        Self {
            viewer: ViewerView::from_author(viewer),
            page_title: page_title.into(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub viewer: ViewerView,
    pub page_title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            viewer: chrome.viewer,
            page_title: chrome.page_title,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCardView {
    pub href: String,
    pub excerpt: String,
    pub author_username: String,
    pub author_href: String,
    pub has_group: bool,
    pub group_title: String,
    pub group_href: String,
    pub published: String,
    pub iso_date: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<&PostRecord> for PostCardView {
    fn from(post: &PostRecord) -> Self {
        let (has_group, group_title, group_href) = match &post.group {
            Some(group) => (true, group.title.clone(), group_href(&group.slug)),
            None => (false, String::new(), String::new()),
        };
        let image_url = post.image_path.as_deref().map(media_href);

        Self {
            href: post_href(post.id),
            excerpt: post.excerpt(),
            author_username: post.author.username.clone(),
            author_href: profile_href(&post.author.username),
            has_group,
            group_title,
            group_href,
            published: display_time(post.created_at),
            iso_date: iso_time(post.created_at),
            has_image: image_url.is_some(),
            image_url: image_url.unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct PaginatorView {
    /// Hidden when everything fits on one page.
    pub visible: bool,
    pub number: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub first_href: String,
    pub previous_href: String,
    pub has_next: bool,
    pub next_href: String,
    pub last_href: String,
}

impl PaginatorView {
    pub fn new(base_path: &str, window: &PageWindow) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");
        Self {
            visible: window.total_pages() > 1,
            number: window.number(),
            total_pages: window.total_pages(),
            has_previous: window.has_previous(),
            first_href: href(1),
            previous_href: window.previous_number().map(href).unwrap_or_default(),
            has_next: window.has_next(),
            next_href: window.next_number().map(href).unwrap_or_default(),
            last_href: href(window.total_pages().max(1)),
        }
    }
}

#[derive(Clone)]
pub struct FeedView {
    pub posts: Vec<PostCardView>,
    pub has_posts: bool,
    pub empty_message: String,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn new(base_path: &str, page: &Page<PostRecord>, empty_message: &str) -> Self {
        let posts: Vec<PostCardView> = page.items.iter().map(PostCardView::from).collect();
        Self {
            has_posts: !posts.is_empty(),
            posts,
            empty_message: empty_message.to_string(),
            paginator: PaginatorView::new(base_path, &page.window),
        }
    }
}

/// Content of the home and following pages.
pub struct FeedPageView {
    pub heading: String,
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedPageView>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedPageView>,
}

pub struct GroupPageView {
    pub title: String,
    pub has_description: bool,
    pub description: String,
    pub feed: FeedView,
}

impl From<&GroupFeed> for GroupPageView {
    fn from(group_feed: &GroupFeed) -> Self {
        let group = &group_feed.group;
        let description = group.description.clone().unwrap_or_default();
        Self {
            title: group.title.clone(),
            has_description: !description.trim().is_empty(),
            description,
            feed: FeedView::new(
                &group_href(&group.slug),
                &group_feed.page,
                "No posts in this group yet.",
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageView>,
}

pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub joined: String,
    pub can_follow: bool,
    pub following: bool,
    pub follow_action: String,
    pub unfollow_action: String,
    pub feed: FeedView,
}

impl From<&ProfileFeed> for ProfileView {
    fn from(profile: &ProfileFeed) -> Self {
        let username = profile.author.username.clone();
        let base = profile_href(&username);
        Self {
            post_count: profile.post_count,
            joined: display_time(profile.author.created_at),
            can_follow: profile.can_follow,
            following: profile.following,
            follow_action: format!("{base}follow/"),
            unfollow_action: format!("{base}unfollow/"),
            feed: FeedView::new(&base, &profile.page, "No posts yet."),
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author.username.clone(),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            published: display_time(comment.created_at),
            iso_date: iso_time(comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub title_fragment: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
    pub author_username: String,
    pub author_href: String,
    pub author_post_count: u64,
    pub has_group: bool,
    pub group_title: String,
    pub group_href: String,
    pub has_image: bool,
    pub image_url: String,
    pub can_edit: bool,
    pub edit_href: String,
    pub can_comment: bool,
    pub comment_action: String,
    pub comments: Vec<CommentView>,
    pub has_comments: bool,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, can_comment: bool) -> Self {
        let post = &detail.post;
        let card = PostCardView::from(post);
        let comments: Vec<CommentView> = detail.comments.iter().map(CommentView::from).collect();
        Self {
            title_fragment: detail.title_fragment.clone(),
            text: post.text.clone(),
            published: card.published,
            iso_date: card.iso_date,
            author_username: card.author_username,
            author_href: card.author_href,
            author_post_count: detail.author_post_count,
            has_group: card.has_group,
            group_title: card.group_title,
            group_href: card.group_href,
            has_image: card.has_image,
            image_url: card.image_url,
            can_edit: detail.can_edit,
            edit_href: format!("{}edit/", card.href),
            can_comment,
            comment_action: format!("{}comment/", card.href),
            has_comments: !comments.is_empty(),
            comments,
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone)]
pub struct GroupOptionView {
    pub value: String,
    pub title: String,
    pub selected: bool,
}

/// Field errors shown next to the post form inputs.
#[derive(Clone, Default)]
pub struct PostFormErrors {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostFormErrors {
    pub fn for_field(field: &str, message: &str) -> Self {
        let mut errors = Self::default();
        match field {
            "group" => errors.group = message.to_string(),
            "image" => errors.image = message.to_string(),
            _ => errors.text = message.to_string(),
        }
        errors
    }
}

pub struct PostFormView {
    pub is_edit: bool,
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub has_image: bool,
    pub image_url: String,
    pub errors: PostFormErrors,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord], text: &str, selected_group: &str) -> Self {
        Self {
            is_edit: false,
            heading: "New post".to_string(),
            action: "/create/".to_string(),
            submit_label: "Publish".to_string(),
            text: text.to_string(),
            groups: group_options(groups, selected_group),
            has_image: false,
            image_url: String::new(),
            errors: PostFormErrors::default(),
        }
    }

    pub fn edit(groups: &[GroupRecord], post: &PostRecord) -> Self {
        let selected = post
            .group
            .as_ref()
            .map(|group| group.id.to_string())
            .unwrap_or_default();
        let image_url = post.image_path.as_deref().map(media_href);
        Self {
            is_edit: true,
            heading: "Edit post".to_string(),
            action: format!("{}edit/", post_href(post.id)),
            submit_label: "Save".to_string(),
            text: post.text.clone(),
            groups: group_options(groups, &selected),
            has_image: image_url.is_some(),
            image_url: image_url.unwrap_or_default(),
            errors: PostFormErrors::default(),
        }
    }

    pub fn with_errors(self, errors: PostFormErrors) -> Self {
        Self { errors, ..self }
    }

    pub fn with_text(self, text: &str, selected_group: &str) -> Self {
        let groups = self
            .groups
            .into_iter()
            .map(|option| GroupOptionView {
                selected: option.value == selected_group.trim(),
                ..option
            })
            .collect();
        Self {
            text: text.to_string(),
            groups,
            ..self
        }
    }
}

fn group_options(groups: &[GroupRecord], selected: &str) -> Vec<GroupOptionView> {
    groups
        .iter()
        .map(|group| {
            let value = group.id.to_string();
            GroupOptionView {
                selected: value == selected.trim(),
                value,
                title: group.title.clone(),
            }
        })
        .collect()
}

#[derive(Template)]
#[template(path = "post_create.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Clone, Default)]
pub struct LoginView {
    pub username: String,
    pub next: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Clone, Default)]
pub struct SignupView {
    pub username: String,
    pub username_error: String,
    pub password_error: String,
    pub confirmation_error: String,
}

impl SignupView {
    pub fn with_error(username: &str, field: &str, message: &str) -> Self {
        let mut view = Self {
            username: username.to_string(),
            ..Self::default()
        };
        match field {
            "password1" => view.password_error = message.to_string(),
            "password2" => view.confirmation_error = message.to_string(),
            _ => view.username_error = message.to_string(),
        }
        view
    }
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
