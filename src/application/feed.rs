//! Feed queries: home, group, profile, following and post detail.

use std::sync::Arc;

use thiserror::Error;

use crate::application::follow::FollowService;
use crate::application::pagination::{Page, PageRequest, Paginator};
use crate::application::repos::{
    AuthorsRepo, CommentsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError,
};
use crate::domain::entities::{AuthorRecord, AuthorRef, CommentRecord, GroupRecord, PostRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("group `{0}` not found")]
    UnknownGroup(String),
    #[error("author `{0}` not found")]
    UnknownAuthor(String),
    #[error("post {0} not found")]
    UnknownPost(i64),
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: AuthorRecord,
    pub post_count: u64,
    pub page: Page<PostRecord>,
    /// True only for a signed-in viewer other than the author who follows them.
    pub following: bool,
    /// Signed-in viewer looking at someone else's profile.
    pub can_follow: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub title_fragment: String,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
    pub can_edit: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    authors: Arc<dyn AuthorsRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: FollowService,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        authors: Arc<dyn AuthorsRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: FollowService,
    ) -> Self {
        Self {
            posts,
            groups,
            authors,
            comments,
            follows,
            paginator: Paginator::default(),
        }
    }

    pub async fn home(&self, request: PageRequest) -> Result<Page<PostRecord>, FeedError> {
        self.page(PostFilter::All, request).await
    }

    pub async fn group(&self, slug: &str, request: PageRequest) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;

        let page = self.page(PostFilter::Group(group.id), request).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        request: PageRequest,
        viewer: Option<&AuthorRef>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .authors
            .find_author_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let page = self.page(PostFilter::Author(author.id), request).await?;
        let post_count = page.window.total_items();

        let can_follow = viewer.is_some_and(|viewer| viewer.id != author.id);
        let following = match viewer {
            Some(viewer) if can_follow => self.follows.is_following(viewer.id, author.id).await?,
            _ => false,
        };

        Ok(ProfileFeed {
            author,
            post_count,
            page,
            following,
            can_follow,
        })
    }

    /// Posts by every author the viewer follows. Anonymous viewers are rejected.
    pub async fn following(
        &self,
        viewer: Option<&AuthorRef>,
        request: PageRequest,
    ) -> Result<Page<PostRecord>, FeedError> {
        let viewer = viewer.ok_or(FeedError::Unauthorized)?;
        self.page(PostFilter::FollowedBy(viewer.id), request).await
    }

    pub async fn post_detail(
        &self,
        id: i64,
        viewer: Option<&AuthorRef>,
    ) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or(FeedError::UnknownPost(id))?;

        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author.id))
            .await?;
        let comments = self.comments.list_comments_for_post(post.id).await?;
        let can_edit = viewer.is_some_and(|viewer| post.is_authored_by(viewer.id));

        Ok(PostDetail {
            title_fragment: post.title_fragment(),
            post,
            author_post_count,
            comments,
            can_edit,
        })
    }

    async fn page(
        &self,
        filter: PostFilter,
        request: PageRequest,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = self.paginator.window(total, request);

        let items = if window.item_count() == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(filter, window.offset(), window.limit())
                .await?
        };

        Ok(Page { items, window })
    }
}
