use async_trait::async_trait;

use crate::application::repos::{
    CreatePostParams, DeletedPost, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::infra::db::{SqliteRepositories, map_sqlx_error, stored_timestamp};

#[async_trait]
impl PostsWriteRepo for SqliteRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let result = sqlx::query(
            "INSERT INTO posts (text, created_at, author_id, group_id, image_path) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&params.text)
        .bind(stored_timestamp(params.created_at)?)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(params.image_path.as_deref())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_post_by_id(result.last_insert_rowid())
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let updated =
            sqlx::query("UPDATE posts SET text = ?, group_id = ?, image_path = ? WHERE id = ?")
                .bind(&params.text)
                .bind(params.group_id)
                .bind(params.image_path.as_deref())
                .bind(params.id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

        if updated == 0 {
            return Err(RepoError::NotFound);
        }

        self.find_post_by_id(params.id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i64) -> Result<DeletedPost, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let image_path: Option<Option<String>> =
            sqlx::query_scalar::<_, Option<String>>("SELECT image_path FROM posts WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let Some(image_path) = image_path else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::NotFound);
        };

        let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DeletedPost {
            comments,
            image_path,
        })
    }
}
