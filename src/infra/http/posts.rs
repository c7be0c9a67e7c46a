//! Authoring routes: create, edit and comment.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        posts::{ImageUpload, PostError, PostInput},
    },
    domain::{entities::AuthorRef, error::DomainError},
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormErrors, PostFormTemplate, PostFormView, post_href,
        profile_href, render_not_found_for, render_not_found_response, render_template_response,
    },
};

use super::{public::HttpState, public::parse_post_id, session::RequireAuthor};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
) -> Response {
    match state.posts.group_choices().await {
        Ok(groups) => render_form(&author, PostFormView::create(&groups, "", "")),
        Err(err) => post_error_to_response(err, &author),
    }
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    multipart: Multipart,
) -> Response {
    let input = match read_post_form(multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (input.text.clone(), input.group.clone());

    match state.posts.create(&author, input).await {
        Ok(_) => Redirect::to(&profile_href(&author.username)).into_response(),
        Err(PostError::Validation(err)) => match state.posts.group_choices().await {
            Ok(groups) => {
                let form = PostFormView::create(&groups, &text, &group)
                    .with_errors(validation_errors(&err));
                render_form(&author, form)
            }
            Err(err) => post_error_to_response(err, &author),
        },
        Err(err) => post_error_to_response(err, &author),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(LayoutChrome::new(Some(&author), "Not found"));
    };

    let post = match state.posts.load_for_edit(id, &author).await {
        Ok(post) => post,
        Err(err) => return post_error_to_response(err, &author),
    };
    match state.posts.group_choices().await {
        Ok(groups) => render_form(&author, PostFormView::edit(&groups, &post)),
        Err(err) => post_error_to_response(err, &author),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(LayoutChrome::new(Some(&author), "Not found"));
    };
    let input = match read_post_form(multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (input.text.clone(), input.group.clone());

    match state.posts.edit(id, &author, input).await {
        Ok(post) => Redirect::to(&post_href(post.id)).into_response(),
        Err(PostError::Validation(err)) => {
            let form = match state.posts.load_for_edit(id, &author).await {
                Ok(post) => match state.posts.group_choices().await {
                    Ok(groups) => PostFormView::edit(&groups, &post),
                    Err(err) => return post_error_to_response(err, &author),
                },
                Err(err) => return post_error_to_response(err, &author),
            };
            let form = form
                .with_text(&text, &group)
                .with_errors(validation_errors(&err));
            render_form(&author, form)
        }
        Err(err) => post_error_to_response(err, &author),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireAuthor(author): RequireAuthor,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(LayoutChrome::new(Some(&author), "Not found"));
    };

    match state.posts.add_comment(id, &author, &form.text).await {
        Ok(_) => Redirect::to(&post_href(id)).into_response(),
        Err(err) => post_error_to_response(err, &author),
    }
}

fn render_form(author: &AuthorRef, form: PostFormView) -> Response {
    let chrome = LayoutChrome::new(Some(author), form.heading.clone());
    let view = LayoutContext::new(chrome, form);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn validation_errors(err: &DomainError) -> PostFormErrors {
    let message = match err {
        DomainError::Validation { message, .. } => message.clone(),
        other => other.to_string(),
    };
    PostFormErrors::for_field(err.field().unwrap_or("text"), &message)
}

fn post_error_to_response(err: PostError, author: &AuthorRef) -> Response {
    match err {
        PostError::UnknownPost(_) => {
            render_not_found_for(LayoutChrome::new(Some(author), "Not found"), err.into())
        }
        PostError::Forbidden { post_id, .. } => Redirect::to(&post_href(post_id)).into_response(),
        other => HttpError::from(other).into_response(),
    }
}

/// Collect the multipart post form. An empty file part means no image was chosen.
async fn read_post_form(mut multipart: Multipart) -> Result<PostInput, HttpError> {
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => input.text = field.text().await.map_err(multipart_error)?,
            "group" => input.group = field.text().await.map_err(multipart_error)?,
            "clear_image" => {
                let value = field.text().await.map_err(multipart_error)?;
                input.clear_image = !value.is_empty() && value != "off";
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if !data.is_empty() {
                    input.image = Some(ImageUpload { filename, data });
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

fn multipart_error(err: MultipartError) -> HttpError {
    HttpError::from_error(SOURCE, err.status(), "Invalid form submission", &err)
}
