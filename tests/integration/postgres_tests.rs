//! Store tests against a live PostgreSQL
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_tests -- --ignored

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;

use bibliotheca::{
    error::AppError,
    inventory,
    models::{
        author::CreateAuthor,
        book::{Book, NewBook},
        category::CategoryInput,
        loan::{LoanFilter, NewLoan},
        publisher::CreatePublisher,
        user::{CreateUser, User},
    },
    repository::{
        AuthorStore, BookStore, CategoryStore, LoanStore, PublisherStore, Repository, UserStore,
    },
};

async fn repository() -> Repository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Repository::new(pool)
}

async fn seed(repo: &Repository, total: i32) -> (Book, User) {
    let author = repo
        .create_author(&CreateAuthor {
            name: "Clarice Lispector".to_string(),
            nationality: Some("Brazilian".to_string()),
        })
        .await
        .unwrap();
    let category = repo
        .create_category(&CategoryInput {
            name: "Romance".to_string(),
        })
        .await
        .unwrap();
    let publisher = repo
        .create_publisher(&CreatePublisher {
            name: "Rocco".to_string(),
            founded_year: Some(1975),
        })
        .await
        .unwrap();
    let book = repo
        .create_book(&NewBook {
            title: "A Hora da Estrela".to_string(),
            author_id: author.id,
            category_id: category.id,
            publisher_id: publisher.id,
            year: Some(1977),
            total,
        })
        .await
        .unwrap();
    let user = repo
        .create_user(&CreateUser {
            name: "Ana".to_string(),
            email: None,
        })
        .await
        .unwrap();
    (book, user)
}

fn new_loan(user_id: i32, book_id: i32) -> NewLoan {
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    inventory::new_loan(user_id, book_id, today, 7).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_concurrent_checkouts_never_oversell() {
    let repo = Arc::new(repository().await);
    let (book, user) = seed(&repo, 3).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let repo = repo.clone();
        let loan = new_loan(user.id, book.id);
        handles.push(tokio::spawn(async move { repo.create_loan(&loan).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert!(matches!(e, AppError::Unavailable(_)), "{:?}", e),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(repo.get_book(book.id).await.unwrap().available, 0);

    let loans = repo
        .list_loans(&LoanFilter::active_for_book(book.id))
        .await
        .unwrap();
    assert_eq!(loans.len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_returns_restore_one_copy() {
    let repo = Arc::new(repository().await);
    let (book, user) = seed(&repo, 2).await;
    let loan = repo.create_loan(&new_loan(user.id, book.id)).await.unwrap();
    assert_eq!(repo.get_book(book.id).await.unwrap().available, 1);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.return_loan(loan.id, Utc::now()).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().returned);
    }

    assert_eq!(repo.get_book(book.id).await.unwrap().available, 2);
}

#[tokio::test]
#[ignore]
async fn test_delete_guards_follow_active_loans() {
    let repo = repository().await;
    let (book, user) = seed(&repo, 1).await;
    let loan = repo.create_loan(&new_loan(user.id, book.id)).await.unwrap();

    assert!(matches!(
        repo.delete_book(book.id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        repo.delete_user(user.id).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        repo.delete_author(book.author_id).await,
        Err(AppError::Conflict(_))
    ));

    repo.return_loan(loan.id, Utc::now()).await.unwrap();

    repo.delete_book(book.id).await.unwrap();
    repo.delete_user(user.id).await.unwrap();
    assert!(matches!(
        repo.get_loan(loan.id).await,
        Err(AppError::NotFound(_))
    ));
    repo.delete_author(book.author_id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_failed_checkout_writes_nothing() {
    let repo = repository().await;
    let (book, user) = seed(&repo, 0).await;

    assert!(matches!(
        repo.create_loan(&new_loan(user.id, book.id)).await,
        Err(AppError::Unavailable(_))
    ));
    assert!(matches!(
        repo.create_loan(&new_loan(i32::MAX, book.id)).await,
        Err(AppError::NotFound(_))
    ));

    let loans = repo
        .list_loans(&LoanFilter {
            book_id: Some(book.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(loans.is_empty());
    assert_eq!(repo.get_book(book.id).await.unwrap().available, 0);
}
