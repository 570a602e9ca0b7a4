//! Repository layer for database operations
//!
//! Services talk to storage through the store traits below. [`Repository`]
//! implements them on PostgreSQL; [`memory::MemoryStore`] keeps everything in
//! process for tests and demos.
//!
//! Operations that change a book's availability (loan creation, return,
//! deletion, total edits) are atomic in every implementation: the rule from
//! [`crate::inventory`] is applied while the book row is locked.

pub mod authors;
pub mod books;
pub mod categories;
pub mod loans;
pub mod memory;
pub mod publishers;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, NewBook, UpdateBook},
        category::{Category, CategoryInput},
        loan::{Loan, LoanDetails, LoanFilter, NewLoan},
        publisher::{CreatePublisher, Publisher, UpdatePublisher},
        user::{CreateUser, UpdateUser, User},
    },
};

#[async_trait]
pub trait BookStore: Send + Sync {
    /// List books with their author, category and publisher names
    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>>;

    async fn get_book(&self, id: i32) -> AppResult<Book>;

    async fn get_book_details(&self, id: i32) -> AppResult<BookDetails>;

    /// Insert a book with every copy available. Referenced author, category
    /// and publisher must exist.
    async fn create_book(&self, book: &NewBook) -> AppResult<Book>;

    /// Apply an edit, adjusting availability when the total changes
    async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<Book>;

    /// Delete a book with no active loan, together with its returned loans
    async fn delete_book(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn list_authors(&self) -> AppResult<Vec<Author>>;
    async fn get_author(&self, id: i32) -> AppResult<Author>;
    async fn create_author(&self, author: &CreateAuthor) -> AppResult<Author>;
    async fn update_author(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author>;
    /// Fails with Conflict while books reference the author
    async fn delete_author(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: i32) -> AppResult<Category>;
    async fn create_category(&self, category: &CategoryInput) -> AppResult<Category>;
    async fn update_category(&self, id: i32, category: &CategoryInput) -> AppResult<Category>;
    /// Fails with Conflict while books reference the category
    async fn delete_category(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait PublisherStore: Send + Sync {
    async fn list_publishers(&self) -> AppResult<Vec<Publisher>>;
    async fn get_publisher(&self, id: i32) -> AppResult<Publisher>;
    async fn create_publisher(&self, publisher: &CreatePublisher) -> AppResult<Publisher>;
    async fn update_publisher(&self, id: i32, publisher: &UpdatePublisher) -> AppResult<Publisher>;
    /// Fails with Conflict while books reference the publisher
    async fn delete_publisher(&self, id: i32) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn get_user(&self, id: i32) -> AppResult<User>;
    async fn create_user(&self, user: &CreateUser) -> AppResult<User>;
    async fn update_user(&self, id: i32, user: &UpdateUser) -> AppResult<User>;
    /// Delete a user with no active loan, together with their returned loans
    async fn delete_user(&self, id: i32) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<Loan>>;

    /// Loans joined with borrower name and book title, newest first.
    /// `is_overdue` is left unset.
    async fn list_loan_details(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>>;

    async fn get_loan(&self, id: i32) -> AppResult<Loan>;

    /// Take one copy of the book and insert the loan in a single transaction.
    /// Fails with NotFound for an unknown user and Unavailable when the book
    /// is missing or has no copy left; nothing is written then.
    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan>;

    /// Mark the loan returned at `at` and put its copy back. Returning a
    /// loan twice leaves it as it was.
    async fn return_loan(&self, id: i32, at: DateTime<Utc>) -> AppResult<Loan>;

    /// Remove a loan; an active loan gives its copy back first
    async fn delete_loan(&self, id: i32) -> AppResult<()>;
}

/// Everything the services need from storage
pub trait LibraryStore:
    BookStore + AuthorStore + CategoryStore + PublisherStore + UserStore + LoanStore
{
}

impl<T> LibraryStore for T where
    T: BookStore + AuthorStore + CategoryStore + PublisherStore + UserStore + LoanStore
{
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Guard for deleting an author, category or publisher
pub(crate) fn ensure_no_books(books: i64, subject: &str) -> AppResult<()> {
    if books > 0 {
        return Err(crate::error::AppError::Conflict(format!(
            "{} is referenced by {} book(s)",
            subject, books
        )));
    }
    Ok(())
}
