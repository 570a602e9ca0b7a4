//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::{LoanStore, Repository};
use crate::{
    error::{AppError, AppResult},
    inventory,
    models::loan::{Loan, LoanDetails, LoanFilter, NewLoan},
};

impl Repository {
    /// Lock a loan row until the surrounding transaction ends
    async fn lock_loan(conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Give the loan's copy back to its book
    async fn restore_copy(conn: &mut PgConnection, book_id: i32) -> AppResult<()> {
        if let Some(mut book) = Self::lock_book(&mut *conn, book_id).await? {
            inventory::check_in(&mut book);
            Self::store_availability(conn, &book).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LoanStore for Repository {
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE ($1::int IS NULL OR user_id = $1)
              AND ($2::int IS NULL OR book_id = $2)
              AND ($3::boolean IS NULL OR returned = $3)
            ORDER BY loan_date DESC, id DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.book_id)
        .bind(filter.returned)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn list_loan_details(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.loan_date, l.due_date,
                   l.returned, l.returned_at,
                   u.name AS user_name, b.title AS book_title
            FROM loans l
            JOIN users u ON u.id = l.user_id
            JOIN books b ON b.id = l.book_id
            WHERE ($1::int IS NULL OR l.user_id = $1)
              AND ($2::int IS NULL OR l.book_id = $2)
              AND ($3::boolean IS NULL OR l.returned = $3)
            ORDER BY l.loan_date DESC, l.id DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.book_id)
        .bind(filter.returned)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Verify user exists and keep it from being deleted meanwhile
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR SHARE")
            .bind(loan.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", loan.user_id)))?;

        let mut book = Self::lock_book(&mut tx, loan.book_id)
            .await?
            .ok_or_else(|| AppError::Unavailable(format!("Book {} is unavailable", loan.book_id)))?;

        inventory::check_out(&mut book)?;
        Self::store_availability(&mut tx, &book).await?;

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, due_date, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn return_loan(&self, id: i32, at: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let mut loan = Self::lock_loan(&mut tx, id).await?;

        if !inventory::mark_returned(&mut loan, at) {
            return Ok(loan);
        }

        Self::restore_copy(&mut tx, loan.book_id).await?;

        let updated = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET returned = TRUE, returned_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_loan(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, id).await?;

        if loan.is_active() {
            Self::restore_copy(&mut tx, loan.book_id).await?;
        }

        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
