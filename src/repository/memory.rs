//! In-process store
//!
//! Every operation holds one lock over all tables, which gives the same
//! all-or-nothing behaviour as the PostgreSQL transactions. Deleting a book
//! or user drops its returned loans, as the foreign-key cascade does.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    ensure_no_books, AuthorStore, BookStore, CategoryStore, LoanStore, PublisherStore, UserStore,
};
use crate::{
    error::{AppError, AppResult},
    inventory,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, NewBook, UpdateBook},
        category::{Category, CategoryInput},
        loan::{Loan, LoanDetails, LoanFilter, NewLoan},
        publisher::{CreatePublisher, Publisher, UpdatePublisher},
        user::{CreateUser, UpdateUser, User},
    },
};

/// Rows keyed by id, with a serial counter that never reuses ids
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> T {
        self.last_id += 1;
        let row = build(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn get(&self, id: i32, label: &str) -> AppResult<&T> {
        self.rows
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", label, id)))
    }

    fn get_mut(&mut self, id: i32, label: &str) -> AppResult<&mut T> {
        self.rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", label, id)))
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

#[derive(Default)]
struct Tables {
    authors: Table<Author>,
    categories: Table<Category>,
    publishers: Table<Publisher>,
    books: Table<Book>,
    users: Table<User>,
    loans: Table<Loan>,
}

impl Tables {
    fn book_details(&self, book: &Book) -> AppResult<BookDetails> {
        Ok(BookDetails {
            book: book.clone(),
            author_name: self.authors.get(book.author_id, "Author")?.name.clone(),
            category_name: self.categories.get(book.category_id, "Category")?.name.clone(),
            publisher_name: self.publishers.get(book.publisher_id, "Publisher")?.name.clone(),
        })
    }

    fn ensure_book_references(&self, book: &Book) -> AppResult<()> {
        self.authors.get(book.author_id, "Author")?;
        self.categories.get(book.category_id, "Category")?;
        self.publishers.get(book.publisher_id, "Publisher")?;
        Ok(())
    }

    fn count_books(&self, pred: impl Fn(&Book) -> bool) -> i64 {
        self.books.rows.values().filter(|b| pred(b)).count() as i64
    }

    fn count_active_loans(&self, pred: impl Fn(&Loan) -> bool) -> i64 {
        self.loans
            .rows
            .values()
            .filter(|l| l.is_active() && pred(l))
            .count() as i64
    }

    fn restore_copy(&mut self, book_id: i32) {
        if let Some(book) = self.books.rows.get_mut(&book_id) {
            inventory::check_in(book);
        }
    }
}

/// Store backed by in-memory tables
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let tables = self.tables.lock().await;
        let mut books = tables
            .books
            .rows
            .values()
            .filter(|b| query.matches(b))
            .map(|b| tables.book_details(b))
            .collect::<AppResult<Vec<_>>>()?;
        books.sort_by(|a, b| a.book.title.cmp(&b.book.title).then(a.book.id.cmp(&b.book.id)));
        Ok(books)
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        let tables = self.tables.lock().await;
        tables.books.get(id, "Book").cloned()
    }

    async fn get_book_details(&self, id: i32) -> AppResult<BookDetails> {
        let tables = self.tables.lock().await;
        let book = tables.books.get(id, "Book")?;
        tables.book_details(book)
    }

    async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let draft = Book {
            id: 0,
            title: book.title.clone(),
            author_id: book.author_id,
            category_id: book.category_id,
            publisher_id: book.publisher_id,
            year: book.year,
            total: book.total,
            available: book.total,
        };
        tables.ensure_book_references(&draft)?;
        Ok(tables.books.insert_with(|id| Book { id, ..draft }))
    }

    async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let mut book = tables.books.get(id, "Book")?.clone();
        inventory::apply_book_update(&mut book, update);
        tables.ensure_book_references(&book)?;
        *tables.books.get_mut(id, "Book")? = book.clone();
        Ok(book)
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.books.get(id, "Book")?;
        let active = tables.count_active_loans(|l| l.book_id == id);
        inventory::ensure_no_active_loans(active, &format!("Book {}", id))?;
        tables.books.rows.remove(&id);
        tables.loans.rows.retain(|_, l| l.book_id != id);
        Ok(())
    }
}

#[async_trait]
impl AuthorStore for MemoryStore {
    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let tables = self.tables.lock().await;
        let mut authors: Vec<Author> = tables.authors.rows.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(authors)
    }

    async fn get_author(&self, id: i32) -> AppResult<Author> {
        let tables = self.tables.lock().await;
        tables.authors.get(id, "Author").cloned()
    }

    async fn create_author(&self, author: &CreateAuthor) -> AppResult<Author> {
        let mut tables = self.tables.lock().await;
        Ok(tables.authors.insert_with(|id| Author {
            id,
            name: author.name.clone(),
            nationality: author.nationality.clone(),
        }))
    }

    async fn update_author(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        let mut tables = self.tables.lock().await;
        let row = tables.authors.get_mut(id, "Author")?;
        if let Some(ref name) = author.name {
            row.name = name.clone();
        }
        if author.nationality.is_some() {
            row.nationality = author.nationality.clone();
        }
        Ok(row.clone())
    }

    async fn delete_author(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.authors.get(id, "Author")?;
        ensure_no_books(tables.count_books(|b| b.author_id == id), &format!("Author {}", id))?;
        tables.authors.rows.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let tables = self.tables.lock().await;
        let mut categories: Vec<Category> = tables.categories.rows.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: i32) -> AppResult<Category> {
        let tables = self.tables.lock().await;
        tables.categories.get(id, "Category").cloned()
    }

    async fn create_category(&self, category: &CategoryInput) -> AppResult<Category> {
        let mut tables = self.tables.lock().await;
        Ok(tables.categories.insert_with(|id| Category {
            id,
            name: category.name.clone(),
        }))
    }

    async fn update_category(&self, id: i32, category: &CategoryInput) -> AppResult<Category> {
        let mut tables = self.tables.lock().await;
        let row = tables.categories.get_mut(id, "Category")?;
        row.name = category.name.clone();
        Ok(row.clone())
    }

    async fn delete_category(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.categories.get(id, "Category")?;
        ensure_no_books(tables.count_books(|b| b.category_id == id), &format!("Category {}", id))?;
        tables.categories.rows.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PublisherStore for MemoryStore {
    async fn list_publishers(&self) -> AppResult<Vec<Publisher>> {
        let tables = self.tables.lock().await;
        let mut publishers: Vec<Publisher> = tables.publishers.rows.values().cloned().collect();
        publishers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(publishers)
    }

    async fn get_publisher(&self, id: i32) -> AppResult<Publisher> {
        let tables = self.tables.lock().await;
        tables.publishers.get(id, "Publisher").cloned()
    }

    async fn create_publisher(&self, publisher: &CreatePublisher) -> AppResult<Publisher> {
        let mut tables = self.tables.lock().await;
        Ok(tables.publishers.insert_with(|id| Publisher {
            id,
            name: publisher.name.clone(),
            founded_year: publisher.founded_year,
        }))
    }

    async fn update_publisher(&self, id: i32, publisher: &UpdatePublisher) -> AppResult<Publisher> {
        let mut tables = self.tables.lock().await;
        let row = tables.publishers.get_mut(id, "Publisher")?;
        if let Some(ref name) = publisher.name {
            row.name = name.clone();
        }
        if publisher.founded_year.is_some() {
            row.founded_year = publisher.founded_year;
        }
        Ok(row.clone())
    }

    async fn delete_publisher(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.publishers.get(id, "Publisher")?;
        ensure_no_books(tables.count_books(|b| b.publisher_id == id), &format!("Publisher {}", id))?;
        tables.publishers.rows.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.rows.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        let tables = self.tables.lock().await;
        tables.users.get(id, "User").cloned()
    }

    async fn create_user(&self, user: &CreateUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.insert_with(|id| User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
        }))
    }

    async fn update_user(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        let row = tables.users.get_mut(id, "User")?;
        if let Some(ref name) = user.name {
            row.name = name.clone();
        }
        if user.email.is_some() {
            row.email = user.email.clone();
        }
        Ok(row.clone())
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.users.get(id, "User")?;
        let active = tables.count_active_loans(|l| l.user_id == id);
        inventory::ensure_no_active_loans(active, &format!("User {}", id))?;
        tables.users.rows.remove(&id);
        tables.loans.rows.retain(|_, l| l.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<Loan> = tables
            .loans
            .rows
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.loan_date.cmp(&a.loan_date).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn list_loan_details(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables.lock().await;
        let mut loans = tables
            .loans
            .rows
            .values()
            .filter(|l| filter.matches(l))
            .map(|l| -> AppResult<LoanDetails> {
                Ok(LoanDetails {
                    loan: l.clone(),
                    user_name: tables.users.get(l.user_id, "User")?.name.clone(),
                    book_title: tables.books.get(l.book_id, "Book")?.title.clone(),
                    is_overdue: false,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        loans.sort_by(|a, b| {
            b.loan
                .loan_date
                .cmp(&a.loan.loan_date)
                .then(b.loan.id.cmp(&a.loan.id))
        });
        Ok(loans)
    }

    async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        let tables = self.tables.lock().await;
        tables.loans.get(id, "Loan").cloned()
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;
        tables.users.get(loan.user_id, "User")?;

        let book = tables
            .books
            .rows
            .get_mut(&loan.book_id)
            .ok_or_else(|| AppError::Unavailable(format!("Book {} is unavailable", loan.book_id)))?;
        inventory::check_out(book)?;

        Ok(tables.loans.insert_with(|id| Loan {
            id,
            user_id: loan.user_id,
            book_id: loan.book_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            returned: false,
            returned_at: None,
        }))
    }

    async fn return_loan(&self, id: i32, at: DateTime<Utc>) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;
        let loan = tables.loans.get_mut(id, "Loan")?;
        if !inventory::mark_returned(loan, at) {
            return Ok(loan.clone());
        }
        let loan = loan.clone();
        tables.restore_copy(loan.book_id);
        Ok(loan)
    }

    async fn delete_loan(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let loan = tables.loans.get(id, "Loan")?.clone();
        if loan.is_active() {
            tables.restore_copy(loan.book_id);
        }
        tables.loans.rows.remove(&id);
        Ok(())
    }
}
