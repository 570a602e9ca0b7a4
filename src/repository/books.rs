//! Book domain methods on Repository

use async_trait::async_trait;
use sqlx::PgConnection;

use super::{BookStore, Repository};
use crate::{
    error::{AppError, AppResult},
    inventory,
    models::book::{Book, BookDetails, BookQuery, NewBook, UpdateBook},
};

const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.category_id, b.publisher_id, b.year,
           b.total, b.available,
           a.name AS author_name, c.name AS category_name, p.name AS publisher_name
    FROM books b
    JOIN authors a ON a.id = b.author_id
    JOIN categories c ON c.id = b.category_id
    JOIN publishers p ON p.id = b.publisher_id
"#;

impl Repository {
    /// Lock a book row until the surrounding transaction ends
    pub(crate) async fn lock_book(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(book)
    }

    /// Write back the availability computed by the inventory rules
    pub(crate) async fn store_availability(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
        sqlx::query("UPDATE books SET available = $1 WHERE id = $2")
            .bind(book.available)
            .bind(book.id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Check (and share-lock) the author, category and publisher of a book
    async fn ensure_book_references(
        conn: &mut PgConnection,
        author_id: i32,
        category_id: i32,
        publisher_id: i32,
    ) -> AppResult<()> {
        for (table, label, id) in [
            ("authors", "Author", author_id),
            ("categories", "Category", category_id),
            ("publishers", "Publisher", publisher_id),
        ] {
            let query = format!("SELECT id FROM {} WHERE id = $1 FOR SHARE", table);
            sqlx::query_scalar::<_, i32>(&query)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", label, id)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookStore for Repository {
    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let sql = format!(
            r#"{}
            WHERE ($1::boolean IS NULL OR (b.available > 0) = $1)
              AND ($2::int IS NULL OR b.author_id = $2)
              AND ($3::int IS NULL OR b.category_id = $3)
              AND ($4::int IS NULL OR b.publisher_id = $4)
            ORDER BY b.title, b.id
            "#,
            DETAILS_SELECT
        );

        let books = sqlx::query_as::<_, BookDetails>(&sql)
            .bind(query.available)
            .bind(query.author_id)
            .bind(query.category_id)
            .bind(query.publisher_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn get_book_details(&self, id: i32) -> AppResult<BookDetails> {
        let sql = format!("{} WHERE b.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, BookDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        Self::ensure_book_references(&mut tx, book.author_id, book.category_id, book.publisher_id)
            .await?;

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, category_id, publisher_id, year, total, available)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(book.category_id)
        .bind(book.publisher_id)
        .bind(book.year)
        .bind(book.total)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = Self::lock_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        inventory::apply_book_update(&mut book, update);

        if update.author_id.is_some() || update.category_id.is_some() || update.publisher_id.is_some() {
            Self::ensure_book_references(&mut tx, book.author_id, book.category_id, book.publisher_id)
                .await?;
        }

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, category_id = $3, publisher_id = $4,
                year = $5, total = $6, available = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(book.category_id)
        .bind(book.publisher_id)
        .bind(book.year)
        .bind(book.total)
        .bind(book.available)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        Self::lock_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        // Loan creation holds this row lock, so the count below is final
        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND NOT returned",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        inventory::ensure_no_active_loans(active_loans, &format!("Book {}", id))?;

        // Returned loans go with the book (ON DELETE CASCADE)
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
