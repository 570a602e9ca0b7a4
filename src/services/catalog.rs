//! Catalog management service (books, authors, categories, publishers)

use std::sync::Arc;

use validator::Validate;

use super::loans::LoansService;
use crate::{
    error::{AppError, AppResult},
    inventory,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, CreateBook, NewBook, UpdateBook},
        category::{Category, CategoryInput},
        publisher::{CreatePublisher, Publisher, UpdatePublisher},
    },
    repository::{AuthorStore, BookStore, CategoryStore, PublisherStore},
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
    authors: Arc<dyn AuthorStore>,
    categories: Arc<dyn CategoryStore>,
    publishers: Arc<dyn PublisherStore>,
    loans: LoansService,
}

impl CatalogService {
    pub fn new(
        books: Arc<dyn BookStore>,
        authors: Arc<dyn AuthorStore>,
        categories: Arc<dyn CategoryStore>,
        publishers: Arc<dyn PublisherStore>,
        loans: LoansService,
    ) -> Self {
        Self {
            books,
            authors,
            categories,
            publishers,
            loans,
        }
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        self.books.list_books(query).await
    }

    /// Get book with author, category and publisher
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.books.get_book_details(id).await
    }

    /// Create a book; all of its copies start available
    pub async fn create_book(&self, request: &CreateBook) -> AppResult<Book> {
        request.validate()?;

        let book = NewBook {
            title: request.title.trim().to_string(),
            author_id: request.author_id,
            category_id: request.category_id,
            publisher_id: request.publisher_id,
            year: request.year,
            total: inventory::initial_total(request.total.as_ref()),
        };

        let created = self.books.create_book(&book).await?;
        tracing::info!("Book {} created with {} copies", created.id, created.total);
        Ok(created)
    }

    /// Update a book; a new total shifts availability by the same amount
    pub async fn update_book(&self, id: i32, request: &UpdateBook) -> AppResult<Book> {
        request.validate()?;

        let updated = self.books.update_book(id, request).await?;
        if request.total.is_some() {
            tracing::info!(
                "Book {} stock is now {}/{} available",
                id,
                updated.available,
                updated.total
            );
        }
        Ok(updated)
    }

    /// Delete a book that has no active loan
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        if !self.loans.can_delete_book(id).await? {
            tracing::warn!("Refusing to delete book {}: active loans", id);
            return Err(AppError::Conflict(format!(
                "Book {} cannot be deleted while it is on loan",
                id
            )));
        }

        // The store re-checks under lock in case a loan was issued meanwhile
        self.books.delete_book(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.authors.list_authors().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.authors.get_author(id).await
    }

    pub async fn create_author(&self, request: &CreateAuthor) -> AppResult<Author> {
        request.validate()?;
        self.authors.create_author(request).await
    }

    pub async fn update_author(&self, id: i32, request: &UpdateAuthor) -> AppResult<Author> {
        request.validate()?;
        self.authors.update_author(id, request).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.authors.delete_author(id).await
    }

    // =========================================================================
    // CATEGORIES
    // =========================================================================

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.categories.list_categories().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.categories.get_category(id).await
    }

    pub async fn create_category(&self, request: &CategoryInput) -> AppResult<Category> {
        request.validate()?;
        self.categories.create_category(request).await
    }

    pub async fn update_category(&self, id: i32, request: &CategoryInput) -> AppResult<Category> {
        request.validate()?;
        self.categories.update_category(id, request).await
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.categories.delete_category(id).await
    }

    // =========================================================================
    // PUBLISHERS
    // =========================================================================

    pub async fn list_publishers(&self) -> AppResult<Vec<Publisher>> {
        self.publishers.list_publishers().await
    }

    pub async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        self.publishers.get_publisher(id).await
    }

    pub async fn create_publisher(&self, request: &CreatePublisher) -> AppResult<Publisher> {
        request.validate()?;
        self.publishers.create_publisher(request).await
    }

    pub async fn update_publisher(&self, id: i32, request: &UpdatePublisher) -> AppResult<Publisher> {
        request.validate()?;
        self.publishers.update_publisher(id, request).await
    }

    pub async fn delete_publisher(&self, id: i32) -> AppResult<()> {
        self.publishers.delete_publisher(id).await
    }
}
