//! Loan management service

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::LoansConfig,
    error::AppResult,
    inventory,
    models::{
        loan::{CreateLoan, Loan, LoanDetails, LoanFilter},
        user::User,
    },
    repository::{LoanStore, UserStore},
};

#[derive(Clone)]
pub struct LoansService {
    loans: Arc<dyn LoanStore>,
    users: Arc<dyn UserStore>,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(loans: Arc<dyn LoanStore>, users: Arc<dyn UserStore>, config: LoansConfig) -> Self {
        Self { loans, users, config }
    }

    /// List loans with borrower and book, flagging overdue ones
    pub async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let today = Utc::now().date_naive();
        let loans = self.loans.list_loan_details(filter).await?;
        Ok(loans.into_iter().map(|l| l.with_overdue(today)).collect())
    }

    /// Full loan history of a user
    pub async fn user_history(&self, user_id: i32) -> AppResult<(User, Vec<LoanDetails>)> {
        // Verify user exists
        let user = self.users.get_user(user_id).await?;
        let filter = LoanFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        let loans = self.list_loans(&filter).await?;
        Ok((user, loans))
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        self.loans.get_loan(id).await
    }

    /// True when no active loan references the book
    pub async fn can_delete_book(&self, book_id: i32) -> AppResult<bool> {
        let loans = self.loans.list_loans(&LoanFilter::active_for_book(book_id)).await?;
        Ok(inventory::can_delete(&loans))
    }

    /// True when the user holds no active loan
    pub async fn can_delete_user(&self, user_id: i32) -> AppResult<bool> {
        let loans = self.loans.list_loans(&LoanFilter::active_for_user(user_id)).await?;
        Ok(inventory::can_delete(&loans))
    }

    /// Issue a book to a user
    pub async fn create_loan(&self, request: &CreateLoan) -> AppResult<Loan> {
        let days = inventory::loan_duration_days(request.days.as_ref(), &self.config);
        let today = Utc::now().date_naive();
        let new_loan = inventory::new_loan(request.user_id, request.book_id, today, days)?;

        let loan = self.loans.create_loan(&new_loan).await?;

        tracing::info!(
            "Loan {} created: book {} to user {}, due {}",
            loan.id,
            loan.book_id,
            loan.user_id,
            loan.due_date
        );
        Ok(loan)
    }

    /// Return a borrowed book; returning twice changes nothing
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self.loans.return_loan(loan_id, Utc::now()).await?;
        tracing::info!("Loan {} returned (book {})", loan.id, loan.book_id);
        Ok(loan)
    }

    /// Administrative removal of a loan record
    pub async fn delete_loan(&self, loan_id: i32) -> AppResult<()> {
        self.loans.delete_loan(loan_id).await?;
        tracing::info!("Loan {} deleted", loan_id);
        Ok(())
    }
}
