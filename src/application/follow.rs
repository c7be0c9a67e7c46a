use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{AuthorsRepo, FollowsRepo, RepoError};
use crate::domain::entities::{AuthorRecord, AuthorRef};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("author `{0}` not found")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What a follow or unfollow request did to the edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    Removed,
    Unchanged,
    /// Follower and target are the same author; nothing is stored.
    SelfFollowIgnored,
}

/// Result of a follow mutation, carrying the resolved target for the redirect.
#[derive(Debug, Clone)]
pub struct FollowChange {
    pub target: AuthorRecord,
    pub outcome: FollowOutcome,
}

#[derive(Clone)]
pub struct FollowService {
    authors: Arc<dyn AuthorsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(authors: Arc<dyn AuthorsRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { authors, follows }
    }

    pub async fn follow(
        &self,
        follower: &AuthorRef,
        target_username: &str,
    ) -> Result<FollowChange, FollowError> {
        let target = self.resolve(target_username).await?;

        if target.id == follower.id {
            debug!(
                target = "blogroll::application::follow",
                author = %follower.username,
                "ignoring self-follow"
            );
            return Ok(FollowChange {
                target,
                outcome: FollowOutcome::SelfFollowIgnored,
            });
        }

        let created = self.follows.create_follow(follower.id, target.id).await?;
        let outcome = if created {
            info!(
                target = "blogroll::application::follow",
                follower = %follower.username,
                author = %target.username,
                "follow created"
            );
            FollowOutcome::Created
        } else {
            FollowOutcome::Unchanged
        };

        Ok(FollowChange { target, outcome })
    }

    pub async fn unfollow(
        &self,
        follower: &AuthorRef,
        target_username: &str,
    ) -> Result<FollowChange, FollowError> {
        let target = self.resolve(target_username).await?;

        let removed = self.follows.delete_follow(follower.id, target.id).await?;
        let outcome = if removed {
            info!(
                target = "blogroll::application::follow",
                follower = %follower.username,
                author = %target.username,
                "follow removed"
            );
            FollowOutcome::Removed
        } else {
            FollowOutcome::Unchanged
        };

        Ok(FollowChange { target, outcome })
    }

    /// Whether `follower` currently follows `author_id`.
    pub async fn is_following(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .follows
            .find_follow(follower_id, author_id)
            .await?
            .is_some())
    }

    async fn resolve(&self, username: &str) -> Result<AuthorRecord, FollowError> {
        self.authors
            .find_author_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
