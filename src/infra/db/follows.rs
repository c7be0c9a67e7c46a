use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{FollowsRepo, RepoError},
    domain::entities::FollowRecord,
};

use super::{SqliteRepositories, map_sqlx_error, stored_timestamp};

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: i64,
    user_id: i64,
    author_id: i64,
    created_at: OffsetDateTime,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FollowsRepo for SqliteRepositories {
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        // The unique (user_id, author_id) constraint arbitrates concurrent follows.
        let inserted = sqlx::query(
            "INSERT INTO follows (user_id, author_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, author_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(author_id)
        .bind(stored_timestamp(OffsetDateTime::now_utc())?)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let deleted = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn find_follow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<Option<FollowRecord>, RepoError> {
        let row = sqlx::query_as::<_, FollowRow>(
            "SELECT id, user_id, author_id, created_at FROM follows \
             WHERE user_id = ? AND author_id = ?",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FollowRecord::from))
    }
}
