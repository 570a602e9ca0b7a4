//! Publisher domain methods on Repository

use async_trait::async_trait;

use super::{ensure_no_books, PublisherStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::publisher::{CreatePublisher, Publisher, UpdatePublisher},
};

#[async_trait]
impl PublisherStore for Repository {
    async fn list_publishers(&self) -> AppResult<Vec<Publisher>> {
        let publishers = sqlx::query_as::<_, Publisher>("SELECT * FROM publishers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(publishers)
    }

    async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>("SELECT * FROM publishers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }

    async fn create_publisher(&self, publisher: &CreatePublisher) -> AppResult<Publisher> {
        let created = sqlx::query_as::<_, Publisher>(
            "INSERT INTO publishers (name, founded_year) VALUES ($1, $2) RETURNING *",
        )
        .bind(&publisher.name)
        .bind(publisher.founded_year)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_publisher(&self, id: i32, publisher: &UpdatePublisher) -> AppResult<Publisher> {
        sqlx::query_as::<_, Publisher>(
            r#"
            UPDATE publishers
            SET name = COALESCE($1, name), founded_year = COALESCE($2, founded_year)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&publisher.name)
        .bind(publisher.founded_year)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))
    }

    async fn delete_publisher(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM publishers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Publisher with id {} not found", id)))?;

        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE publisher_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        ensure_no_books(books, &format!("Publisher {}", id))?;

        sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
