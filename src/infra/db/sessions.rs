use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CreateSessionParams, RepoError, SessionsRepo},
    domain::entities::SessionRecord,
};

use super::{SqliteRepositories, map_sqlx_error, stored_timestamp};

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    author_id: i64,
    prefix: String,
    hashed_secret: Vec<u8>,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl SessionsRepo for SqliteRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let result = sqlx::query(
            "INSERT INTO sessions (author_id, prefix, hashed_secret, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(params.author_id)
        .bind(&params.prefix)
        .bind(&params.hashed_secret)
        .bind(stored_timestamp(params.created_at)?)
        .bind(stored_timestamp(params.expires_at)?)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SessionRecord {
            id: result.last_insert_rowid(),
            author_id: params.author_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: params.created_at,
            expires_at: params.expires_at,
        })
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, author_id, prefix, hashed_secret, created_at, expires_at \
             FROM sessions WHERE prefix = ?",
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SessionRecord::from))
    }

    async fn delete_session(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(stored_timestamp(now)?)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        Ok(deleted)
    }
}
