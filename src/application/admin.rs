//! Site administration: group management and cascading deletes.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    AuthorsRepo, CreateGroupParams, DeletedAuthor, DeletedPost, GroupsRepo, PostsRepo,
    PostsWriteRepo, RepoError,
};
use crate::cache::PageCache;
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};
use crate::infra::uploads::UploadStorage;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("title must be between 1 and {MAX_TITLE_LEN} characters")]
    InvalidTitle,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("group slug `{0}` is already taken")]
    DuplicateSlug(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct AdminService {
    authors: Arc<dyn AuthorsRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    uploads: Arc<UploadStorage>,
    cache: PageCache,
}

impl AdminService {
    pub fn new(
        authors: Arc<dyn AuthorsRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        uploads: Arc<UploadStorage>,
        cache: PageCache,
    ) -> Self {
        Self {
            authors,
            groups,
            posts,
            writer,
            uploads,
            cache,
        }
    }

    pub async fn create_group(&self, cmd: CreateGroupCommand) -> Result<GroupRecord, AdminError> {
        let title = cmd.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(AdminError::InvalidTitle);
        }

        let slug = match cmd.slug.map(|value| value.trim().to_string()) {
            Some(slug) if !slug.is_empty() => {
                validate_slug(&slug)?;
                slug
            }
            _ => derive_slug(&title)?,
        };

        let description = cmd
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let group = match self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description,
            })
            .await
        {
            Ok(group) => group,
            Err(RepoError::Duplicate { .. }) => return Err(AdminError::DuplicateSlug(slug)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "blogroll::application::admin",
            group = %group.slug,
            "group created"
        );
        Ok(group)
    }

    /// Delete a group. Its posts survive with no group. Returns how many were detached.
    pub async fn delete_group(&self, slug: &str) -> Result<u64, AdminError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(AdminError::NotFound("group"))?;

        let detached = self
            .groups
            .delete_group(group.id)
            .await
            .map_err(not_found("group"))?;
        info!(
            target = "blogroll::application::admin",
            group = %group.slug,
            detached,
            "group deleted"
        );
        Ok(detached)
    }

    pub async fn delete_author(&self, username: &str) -> Result<DeletedAuthor, AdminError> {
        let author = self
            .authors
            .find_author_by_username(username)
            .await?
            .ok_or(AdminError::NotFound("author"))?;

        let deleted = self
            .authors
            .delete_author(author.id)
            .await
            .map_err(not_found("author"))?;

        for path in &deleted.image_paths {
            self.discard_image(path).await;
        }

        info!(
            target = "blogroll::application::admin",
            author = %author.username,
            posts = deleted.posts,
            comments = deleted.comments,
            follows = deleted.follows,
            sessions = deleted.sessions,
            "author deleted"
        );
        Ok(deleted)
    }

    pub async fn delete_post(&self, id: i64) -> Result<DeletedPost, AdminError> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or(AdminError::NotFound("post"))?;

        let deleted = self
            .writer
            .delete_post(id)
            .await
            .map_err(not_found("post"))?;
        if let Some(path) = deleted.image_path.as_deref() {
            self.discard_image(path).await;
        }

        info!(
            target = "blogroll::application::admin",
            post_id = id,
            label = %post.display_label(),
            comments = deleted.comments,
            "post deleted"
        );
        Ok(deleted)
    }

    pub fn invalidate_cache(&self) -> usize {
        let removed = self.cache.invalidate_all();
        info!(
            target = "blogroll::application::admin",
            removed, "page cache cleared"
        );
        removed
    }

    pub fn invalidate_cache_key(&self, key: &str) -> bool {
        let removed = self.cache.invalidate(key);
        info!(
            target = "blogroll::application::admin",
            key, removed, "page cache key invalidated"
        );
        removed
    }

    async fn discard_image(&self, path: &str) {
        if let Err(err) = self.uploads.delete(path).await {
            warn!(
                target = "blogroll::application::admin",
                path,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}

fn not_found(entity: &'static str) -> impl Fn(RepoError) -> AdminError {
    move |err| match err {
        RepoError::NotFound => AdminError::NotFound(entity),
        other => AdminError::Repo(other),
    }
}
