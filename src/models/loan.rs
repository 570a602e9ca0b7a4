//! Loan (borrow) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// A loan is active until it has been returned
    pub fn is_active(&self) -> bool {
        !self.returned
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.due_date < today
    }
}

/// Loan with borrower name and book title for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub loan: Loan,
    pub user_name: String,
    pub book_title: String,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl LoanDetails {
    /// Compute the overdue flag against `today`
    pub fn with_overdue(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.loan.is_overdue(today);
        self
    }
}

/// Loan list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanFilter {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    /// `false` for active loans only, `true` for returned loans only
    pub returned: Option<bool>,
}

impl LoanFilter {
    /// Active loans referencing a book
    pub fn active_for_book(book_id: i32) -> Self {
        Self {
            book_id: Some(book_id),
            returned: Some(false),
            ..Default::default()
        }
    }

    /// Active loans held by a user
    pub fn active_for_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            returned: Some(false),
            ..Default::default()
        }
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        self.user_id.map_or(true, |id| loan.user_id == id)
            && self.book_id.map_or(true, |id| loan.book_id == id)
            && self.returned.map_or(true, |r| loan.returned == r)
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
    /// Loan duration in days; numbers or numeric strings, defaults to 7
    #[schema(value_type = Option<i64>)]
    pub days: Option<Value>,
}

/// Loan row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}
