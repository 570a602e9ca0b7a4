//! Circulation scenarios run through the services on the in-memory store

use std::sync::Arc;

use serde_json::json;

use bibliotheca::{
    config::LoansConfig,
    error::AppError,
    models::{
        author::CreateAuthor,
        book::{CreateBook, UpdateBook},
        category::CategoryInput,
        loan::{CreateLoan, LoanFilter},
        publisher::CreatePublisher,
        user::CreateUser,
    },
    repository::{memory::MemoryStore, BookStore},
    services::Services,
};

struct Library {
    store: Arc<MemoryStore>,
    services: Services,
}

impl Library {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = Services::new(store.clone(), LoansConfig::default());
        Self { store, services }
    }

    async fn book(&self, total: i64) -> i32 {
        let catalog = &self.services.catalog;
        let author = catalog
            .create_author(&CreateAuthor {
                name: "Antoine de Saint-Exupéry".to_string(),
                nationality: Some("French".to_string()),
            })
            .await
            .unwrap();
        let category = catalog
            .create_category(&CategoryInput {
                name: "Fábula".to_string(),
            })
            .await
            .unwrap();
        let publisher = catalog
            .create_publisher(&CreatePublisher {
                name: "Agir".to_string(),
                founded_year: None,
            })
            .await
            .unwrap();

        catalog
            .create_book(&CreateBook {
                title: "O Pequeno Príncipe".to_string(),
                author_id: author.id,
                category_id: category.id,
                publisher_id: publisher.id,
                year: Some(1943),
                total: Some(json!(total)),
            })
            .await
            .unwrap()
            .id
    }

    async fn user(&self, name: &str) -> i32 {
        self.services
            .users
            .create_user(&CreateUser {
                name: name.to_string(),
                email: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn borrow(&self, user_id: i32, book_id: i32) -> Result<i32, AppError> {
        self.services
            .loans
            .create_loan(&CreateLoan {
                user_id,
                book_id,
                days: Some(json!(7)),
            })
            .await
            .map(|loan| loan.id)
    }

    async fn stock(&self, book_id: i32) -> (i32, i32) {
        let book = self.store.get_book(book_id).await.unwrap();
        (book.total, book.available)
    }
}

#[tokio::test]
async fn test_third_borrow_of_two_copies_is_rejected() {
    let library = Library::new();
    let book = library.book(2).await;
    let (u1, u2, u3) = (
        library.user("Maria").await,
        library.user("João").await,
        library.user("Ana").await,
    );

    library.borrow(u1, book).await.unwrap();
    assert_eq!(library.stock(book).await, (2, 1));

    library.borrow(u2, book).await.unwrap();
    assert_eq!(library.stock(book).await, (2, 0));

    let err = library.borrow(u3, book).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(library.stock(book).await, (2, 0));

    let active = library
        .services
        .loans
        .list_loans(&LoanFilter::active_for_book(book))
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_return_restores_one_copy_once() {
    let library = Library::new();
    let book = library.book(2).await;
    let u1 = library.user("Maria").await;
    let u2 = library.user("João").await;

    let loan1 = library.borrow(u1, book).await.unwrap();
    library.borrow(u2, book).await.unwrap();

    let returned = library.services.loans.return_loan(loan1).await.unwrap();
    assert!(returned.returned);
    assert_eq!(library.stock(book).await, (2, 1));

    let again = library.services.loans.return_loan(loan1).await.unwrap();
    assert_eq!(again, returned);
    assert_eq!(library.stock(book).await, (2, 1));
}

#[tokio::test]
async fn test_shrinking_total_below_loans() {
    let library = Library::new();
    let book = library.book(3).await;
    let user = library.user("Maria").await;
    library.borrow(user, book).await.unwrap();
    library.borrow(user, book).await.unwrap();
    assert_eq!(library.stock(book).await, (3, 1));

    let update = UpdateBook {
        total: Some(json!(1)),
        ..Default::default()
    };
    library.services.catalog.update_book(book, &update).await.unwrap();
    assert_eq!(library.stock(book).await, (1, 0));
}

#[tokio::test]
async fn test_delete_guards_follow_active_loans() {
    let library = Library::new();
    let book = library.book(1).await;
    let user = library.user("Maria").await;
    let loans = &library.services.loans;

    assert!(loans.can_delete_book(book).await.unwrap());
    assert!(loans.can_delete_user(user).await.unwrap());

    let loan = library.borrow(user, book).await.unwrap();
    assert!(!loans.can_delete_book(book).await.unwrap());
    assert!(!loans.can_delete_user(user).await.unwrap());

    assert!(matches!(
        library.services.catalog.delete_book(book).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        library.services.users.delete_user(user).await,
        Err(AppError::Conflict(_))
    ));

    loans.return_loan(loan).await.unwrap();
    assert!(loans.can_delete_book(book).await.unwrap());

    library.services.catalog.delete_book(book).await.unwrap();
    library.services.users.delete_user(user).await.unwrap();
}

#[tokio::test]
async fn test_availability_bounds_under_mixed_operations() {
    let library = Library::new();
    let book = library.book(2).await;
    let user = library.user("Maria").await;
    let mut open = Vec::new();

    for step in 0..24 {
        match step % 4 {
            0 | 1 => {
                if let Ok(id) = library.borrow(user, book).await {
                    open.push(id);
                }
            }
            2 => {
                let total = [0, 1, 3, 2][(step / 4) % 4];
                let update = UpdateBook {
                    total: Some(json!(total)),
                    ..Default::default()
                };
                library.services.catalog.update_book(book, &update).await.unwrap();
            }
            _ => {
                if let Some(id) = open.pop() {
                    library.services.loans.return_loan(id).await.unwrap();
                }
            }
        }

        let (total, available) = library.stock(book).await;
        assert!(
            available >= 0 && available <= total,
            "step {}: available {} total {}",
            step,
            available,
            total
        );
    }
}
