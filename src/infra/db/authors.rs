use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{AuthorsRepo, CreateAuthorParams, DeletedAuthor, RepoError},
    domain::entities::AuthorRecord,
};

use super::{SqliteRepositories, map_sqlx_error, stored_timestamp};

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    username: String,
    password_hash: String,
    created_at: OffsetDateTime,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

const AUTHOR_COLUMNS: &str = "SELECT id, username, password_hash, created_at FROM authors";

#[async_trait]
impl AuthorsRepo for SqliteRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let result = sqlx::query(
            "INSERT INTO authors (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(&params.username)
        .bind(&params.password_hash)
        .bind(stored_timestamp(params.created_at)?)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AuthorRecord {
            id: result.last_insert_rowid(),
            username: params.username,
            password_hash: params.password_hash,
            created_at: params.created_at,
        })
    }

    async fn find_author_by_id(&self, id: i64) -> Result<Option<AuthorRecord>, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!("{AUTHOR_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }

    async fn find_author_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthorRecord>, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!("{AUTHOR_COLUMNS} WHERE username = ?"))
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }

    async fn delete_author(&self, id: i64) -> Result<DeletedAuthor, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let image_paths = sqlx::query_scalar::<_, String>(
            "SELECT image_path FROM posts WHERE author_id = ? AND image_path IS NOT NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let comments = sqlx::query(
            "DELETE FROM comments \
             WHERE author_id = ? OR post_id IN (SELECT id FROM posts WHERE author_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let posts = sqlx::query("DELETE FROM posts WHERE author_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let follows = sqlx::query("DELETE FROM follows WHERE user_id = ? OR author_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let sessions = sqlx::query("DELETE FROM sessions WHERE author_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DeletedAuthor {
            posts,
            comments,
            follows,
            sessions,
            image_paths,
        })
    }
}
