//! Authoring: creating and editing posts, commenting.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{AuthorRef, CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{validate_comment_text, validate_post_text};
use crate::infra::uploads::{UploadStorage, UploadStorageError};

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("post {0} not found")]
    UnknownPost(i64),
    #[error("author {author_id} may not edit post {post_id}")]
    Forbidden { post_id: i64, author_id: i64 },
    #[error("failed to store image")]
    Storage(#[source] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Post form as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    /// Raw `group` field: empty for none, otherwise a group id.
    pub group: String,
    pub image: Option<ImageUpload>,
    /// Edit only: drop the current image.
    pub clear_image: bool,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            uploads,
        }
    }

    /// Groups offered by the post form.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create(
        &self,
        author: &AuthorRef,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let text = validate_post_text(&input.text)?;
        let group_id = self.resolve_group(&input.group).await?;

        let image_path = match input.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text,
                group_id,
                image_path: image_path.clone(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await;

        match created {
            Ok(post) => {
                info!(
                    target = "blogroll::application::posts",
                    post_id = post.id,
                    author = %author.username,
                    label = %post.display_label(),
                    "post created"
                );
                Ok(post)
            }
            Err(err) => {
                if let Some(path) = image_path {
                    self.discard_image(&path).await;
                }
                Err(err.into())
            }
        }
    }

    /// Load a post for editing, enforcing authorship.
    pub async fn load_for_edit(
        &self,
        post_id: i64,
        editor: &AuthorRef,
    ) -> Result<PostRecord, PostError> {
        let post = self
            .posts
            .find_post_by_id(post_id)
            .await?
            .ok_or(PostError::UnknownPost(post_id))?;

        if !post.is_authored_by(editor.id) {
            return Err(PostError::Forbidden {
                post_id,
                author_id: editor.id,
            });
        }

        Ok(post)
    }

    pub async fn edit(
        &self,
        post_id: i64,
        editor: &AuthorRef,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self.load_for_edit(post_id, editor).await?;
        let text = validate_post_text(&input.text)?;
        let group_id = self.resolve_group(&input.group).await?;

        let replacement = match input.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };
        let image_path = match (&replacement, input.clear_image) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => existing.image_path.clone(),
        };

        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id,
                image_path: image_path.clone(),
            })
            .await;

        let post = match updated {
            Ok(post) => post,
            Err(err) => {
                if let Some(path) = replacement {
                    self.discard_image(&path).await;
                }
                return Err(err.into());
            }
        };

        if let Some(previous) = existing.image_path
            && image_path.as_deref() != Some(previous.as_str())
        {
            self.discard_image(&previous).await;
        }

        info!(
            target = "blogroll::application::posts",
            post_id = post.id,
            author = %editor.username,
            "post edited"
        );
        Ok(post)
    }

    /// Attach a comment. Blank text stores nothing and yields `None`.
    pub async fn add_comment(
        &self,
        post_id: i64,
        author: &AuthorRef,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostError> {
        let post = self
            .posts
            .find_post_by_id(post_id)
            .await?
            .ok_or(PostError::UnknownPost(post_id))?;

        let Ok(text) = validate_comment_text(text) else {
            return Ok(None);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        Ok(Some(comment))
    }

    async fn resolve_group(&self, raw: &str) -> Result<Option<i64>, PostError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let invalid = || DomainError::validation("group", "select a valid group");
        let id: i64 = raw.parse().map_err(|_| invalid())?;
        let group = self.groups.find_group_by_id(id).await?.ok_or_else(invalid)?;
        Ok(Some(group.id))
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, PostError> {
        match self.uploads.store_image(&upload.filename, upload.data).await {
            Ok(stored) => Ok(stored.stored_path),
            Err(UploadStorageError::NotAnImage | UploadStorageError::EmptyPayload) => Err(
                DomainError::validation("image", "upload a valid image file").into(),
            ),
            Err(err) => Err(PostError::Storage(err)),
        }
    }

    async fn discard_image(&self, stored_path: &str) {
        if let Err(err) = self.uploads.delete(stored_path).await {
            warn!(
                target = "blogroll::application::posts",
                path = stored_path,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}
