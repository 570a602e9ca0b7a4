//! Category domain methods on Repository

use async_trait::async_trait;

use super::{ensure_no_books, CategoryStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CategoryInput},
};

#[async_trait]
impl CategoryStore for Repository {
    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    async fn create_category(&self, category: &CategoryInput) -> AppResult<Category> {
        let created =
            sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING *")
                .bind(&category.name)
                .fetch_one(&self.pool)
                .await?;
        Ok(created)
    }

    async fn update_category(&self, id: i32, category: &CategoryInput) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("UPDATE categories SET name = $1 WHERE id = $2 RETURNING *")
            .bind(&category.name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    async fn delete_category(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))?;

        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        ensure_no_books(books, &format!("Category {}", id))?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
