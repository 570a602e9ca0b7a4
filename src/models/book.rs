//! Book model and related types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub category_id: i32,
    pub publisher_id: i32,
    pub year: Option<i32>,
    /// Copies owned by the library
    pub total: i32,
    /// Copies not currently on loan (derived from `total` and active loans)
    pub available: i32,
}

/// Book with its author, category and publisher names joined in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub author_name: String,
    pub category_name: String,
    pub publisher_name: String,
}

/// Book list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Only books with (true) or without (false) a loanable copy
    pub available: Option<bool>,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
}

impl BookQuery {
    /// Whether a book passes every filter that is set
    pub fn matches(&self, book: &Book) -> bool {
        self.available.map_or(true, |a| (book.available > 0) == a)
            && self.author_id.map_or(true, |id| book.author_id == id)
            && self.category_id.map_or(true, |id| book.category_id == id)
            && self.publisher_id.map_or(true, |id| book.publisher_id == id)
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(custom(function = "crate::models::input::not_blank"))]
    pub title: String,
    pub author_id: i32,
    pub category_id: i32,
    pub publisher_id: i32,
    pub year: Option<i32>,
    /// Number of copies; numbers or numeric strings, defaults to 1
    #[schema(value_type = Option<i64>)]
    pub total: Option<Value>,
}

/// Book row ready for insertion; every copy starts available
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author_id: i32,
    pub category_id: i32,
    pub publisher_id: i32,
    pub year: Option<i32>,
    pub total: i32,
}

/// Update book request (only provided fields change)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(custom(function = "crate::models::input::not_blank"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
    pub year: Option<i32>,
    /// New number of copies; unusable values keep the current total
    #[schema(value_type = Option<i64>)]
    pub total: Option<Value>,
}
