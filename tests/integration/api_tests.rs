//! API integration tests
//!
//! Drive the full router in-process against the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bibliotheca::{
    api, config::LoansConfig, repository::memory::MemoryStore, services::Services, AppState,
};

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let loans = LoansConfig::default();
        let services = Services::new(Arc::new(MemoryStore::new()), loans);
        let state = AppState {
            services: Arc::new(services),
        };
        Self {
            router: api::create_router(state),
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse response")
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, None).await
    }

    /// Create author, category and publisher, then a book with `total` copies
    async fn seed_book(&self, total: Value) -> i64 {
        let (_, author) = self
            .post("/authors", json!({ "name": "Machado de Assis", "nationality": "Brazilian" }))
            .await;
        let (_, category) = self.post("/categories", json!({ "name": "Romance" })).await;
        let (_, publisher) = self
            .post("/publishers", json!({ "name": "Garnier", "founded_year": 1844 }))
            .await;

        let (status, book) = self
            .post(
                "/books",
                json!({
                    "title": "Dom Casmurro",
                    "author_id": author["id"],
                    "category_id": category["id"],
                    "publisher_id": publisher["id"],
                    "year": 1899,
                    "total": total
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        book["id"].as_i64().expect("No book ID")
    }

    async fn seed_user(&self, name: &str) -> i64 {
        let (status, user) = self.post("/users", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED);
        user["id"].as_i64().expect("No user ID")
    }

    async fn available(&self, book_id: i64) -> i64 {
        let (_, book) = self.get(&format!("/books/{}", book_id)).await;
        book["available"].as_i64().expect("No availability")
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_book_details_include_associations() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!("3")).await;

    let (status, body) = app.get(&format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["available"], 3);
    assert_eq!(body["author_name"], "Machado de Assis");
    assert_eq!(body["category_name"], "Romance");
    assert_eq!(body["publisher_name"], "Garnier");
}

#[tokio::test]
async fn test_invalid_total_defaults_to_one_copy() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!("lots")).await;
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_create_book_with_missing_author() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/books",
            json!({ "title": "Orphan", "author_id": 7, "category_id": 7, "publisher_id": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/users", json!({ "name": "Maria", "email": "not-an-email" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = app.post("/categories", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_names_are_rejected() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;
    let (_, book) = app.get(&format!("/books/{}", book_id)).await;

    let (status, body) = app
        .post(
            "/books",
            json!({
                "title": "   ",
                "author_id": book["author_id"],
                "category_id": book["category_id"],
                "publisher_id": book["publisher_id"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = app
        .put(&format!("/books/{}", book_id), json!({ "title": " \t " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for uri in ["/authors", "/categories", "/publishers", "/users"] {
        let (status, _) = app.post(uri, json!({ "name": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let (_, book) = app.get(&format!("/books/{}", book_id)).await;
    assert_eq!(book["title"], "Dom Casmurro");

    let (_, books) = app.get("/books").await;
    assert_eq!(books.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_loan_lifecycle() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(2)).await;
    let maria = app.seed_user("Maria").await;
    let joao = app.seed_user("João").await;
    let ana = app.seed_user("Ana").await;

    let (status, loan1) = app
        .post("/loans", json!({ "user_id": maria, "book_id": book_id, "days": 7 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan1["returned"], false);
    assert_eq!(app.available(book_id).await, 1);

    let (status, _) = app
        .post("/loans", json!({ "user_id": joao, "book_id": book_id, "days": "7" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.available(book_id).await, 0);

    let (status, body) = app
        .post("/loans", json!({ "user_id": ana, "book_id": book_id, "days": 7 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BookUnavailable");
    assert_eq!(app.available(book_id).await, 0);

    let loan1_id = loan1["id"].as_i64().unwrap();
    let (status, body) = app.post(&format!("/loans/{}/return", loan1_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["returned"], true);
    assert!(body["loan"]["returned_at"].is_string());
    assert_eq!(app.available(book_id).await, 1);

    // Returning again changes nothing
    let (status, again) = app.post(&format!("/loans/{}/return", loan1_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["loan"]["returned_at"], body["loan"]["returned_at"]);
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_return_unknown_loan() {
    let app = TestApp::new();
    let (status, _) = app.post("/loans/404/return", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loan_for_unknown_user() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;

    let (status, _) = app
        .post("/loans", json!({ "user_id": 999, "book_id": book_id }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_book_delete_blocked_by_active_loan() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;
    let user_id = app.seed_user("Maria").await;

    let (_, loan) = app
        .post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
        .await;

    let (status, body) = app.delete(&format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, _) = app.delete(&format!("/users/{}", user_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post(&format!("/loans/{}/return", loan["id"]), json!({})).await;

    let (status, _) = app.delete(&format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/books/{}", book_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/users/{}", user_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_update_total_adjusts_availability() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(3)).await;
    let user_id = app.seed_user("Maria").await;

    for _ in 0..2 {
        app.post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
            .await;
    }
    assert_eq!(app.available(book_id).await, 1);

    let (status, book) = app
        .put(&format!("/books/{}", book_id), json!({ "total": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["total"], 1);
    assert_eq!(book["available"], 0);

    // Unusable totals keep the current one
    let (_, book) = app
        .put(&format!("/books/{}", book_id), json!({ "total": "n/a", "title": "Dom Casmurro (2a ed.)" }))
        .await;
    assert_eq!(book["total"], 1);
    assert_eq!(book["title"], "Dom Casmurro (2a ed.)");
}

#[tokio::test]
async fn test_available_filter_and_loan_listing() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;
    let user_id = app.seed_user("Maria").await;

    let (_, books) = app.get("/books?available=true").await;
    assert_eq!(books.as_array().unwrap().len(), 1);

    app.post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
        .await;

    let (_, books) = app.get("/books?available=true").await;
    assert!(books.as_array().unwrap().is_empty());

    let (status, loans) = app.get("/loans?returned=false").await;
    assert_eq!(status, StatusCode::OK);
    let loans = loans.as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["user_name"], "Maria");
    assert_eq!(loans[0]["book_title"], "Dom Casmurro");
    assert_eq!(loans[0]["is_overdue"], false);
}

#[tokio::test]
async fn test_user_history() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(2)).await;
    let user_id = app.seed_user("João").await;

    let (_, first) = app
        .post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
        .await;
    app.post(&format!("/loans/{}/return", first["id"]), json!({})).await;
    app.post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
        .await;

    let (status, history) = app.get(&format!("/users/{}/history", user_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["user"]["name"], "João");
    assert_eq!(history["loans"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/users/999/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_active_loan_restores_copy() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;
    let user_id = app.seed_user("Maria").await;

    let (_, loan) = app
        .post("/loans", json!({ "user_id": user_id, "book_id": book_id }))
        .await;
    assert_eq!(app.available(book_id).await, 0);

    let (status, _) = app.delete(&format!("/loans/{}", loan["id"])).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.available(book_id).await, 1);
}

#[tokio::test]
async fn test_catalog_entity_in_use() {
    let app = TestApp::new();
    let book_id = app.seed_book(json!(1)).await;
    let (_, book) = app.get(&format!("/books/{}", book_id)).await;

    let (status, _) = app.delete(&format!("/publishers/{}", book["publisher_id"])).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, author) = app
        .put(&format!("/authors/{}", book["author_id"]), json!({ "nationality": "Brasileiro" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(author["name"], "Machado de Assis");
    assert_eq!(author["nationality"], "Brasileiro");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
