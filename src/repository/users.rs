//! User (borrower) domain methods on Repository

use async_trait::async_trait;

use super::{Repository, UserStore};
use crate::{
    error::{AppError, AppResult},
    inventory,
    models::user::{CreateUser, UpdateUser, User},
};

#[async_trait]
impl UserStore for Repository {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn create_user(&self, user: &CreateUser) -> AppResult<User> {
        let created =
            sqlx::query_as::<_, User>("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING *")
                .bind(&user.name)
                .bind(&user.email)
                .fetch_one(&self.pool)
                .await?;
        Ok(created)
    }

    async fn update_user(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($1, name), email = COALESCE($2, email)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Loan creation share-locks the borrower row
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND NOT returned",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        inventory::ensure_no_active_loans(active_loans, &format!("User {}", id))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
