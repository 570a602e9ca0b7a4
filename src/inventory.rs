//! Inventory and loan consistency rules
//!
//! A book's `available` count tracks its total copies minus active loans.
//! These functions are pure; the stores call them while holding the book row
//! (or the whole table set, for the in-memory store) so that every change to
//! `available` lands in the same transaction as the loan write it pairs with.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde_json::Value;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, UpdateBook},
        input::coerce_int,
        loan::{Loan, NewLoan},
    },
};

/// Number of copies for a new book. Defaults to one copy.
pub fn initial_total(raw: Option<&Value>) -> i32 {
    non_negative(raw).unwrap_or(1)
}

/// Number of copies requested by an edit. Unusable input keeps `current`.
pub fn requested_total(raw: Option<&Value>, current: i32) -> i32 {
    non_negative(raw).unwrap_or(current)
}

fn non_negative(raw: Option<&Value>) -> Option<i32> {
    coerce_int(raw)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n >= 0)
}

/// Loan duration in days: positive, clamped to the configured maximum,
/// otherwise the configured default.
pub fn loan_duration_days(raw: Option<&Value>, config: &LoansConfig) -> i64 {
    match coerce_int(raw) {
        Some(days) if days > 0 => days.min(config.max_duration_days.max(1)),
        _ => config.default_duration_days,
    }
}

/// Change a book's total, shifting `available` by the same delta.
///
/// Availability is floored at zero when copies still on loan exceed the new
/// total, and never exceeds the new total.
pub fn adjust_total(book: &mut Book, new_total: i32) {
    if new_total < 0 {
        return;
    }
    let delta = new_total - book.total;
    book.available = (book.available + delta).max(0).min(new_total);
    book.total = new_total;
}

/// Apply an edit request to a book record
pub fn apply_book_update(book: &mut Book, update: &UpdateBook) {
    if let Some(ref title) = update.title {
        book.title = title.trim().to_string();
    }
    if let Some(author_id) = update.author_id {
        book.author_id = author_id;
    }
    if let Some(category_id) = update.category_id {
        book.category_id = category_id;
    }
    if let Some(publisher_id) = update.publisher_id {
        book.publisher_id = publisher_id;
    }
    if update.year.is_some() {
        book.year = update.year;
    }
    if update.total.is_some() {
        let new_total = requested_total(update.total.as_ref(), book.total);
        adjust_total(book, new_total);
    }
}

/// Take one copy for a new loan
pub fn check_out(book: &mut Book) -> AppResult<()> {
    if book.available <= 0 {
        return Err(AppError::Unavailable(format!(
            "Book {} has no available copies",
            book.id
        )));
    }
    book.available -= 1;
    Ok(())
}

/// Put one copy back on the shelf
pub fn check_in(book: &mut Book) {
    book.available = (book.available + 1).min(book.total);
}

/// Mark a loan returned. Returns `false` if it already was, leaving it untouched.
pub fn mark_returned(loan: &mut Loan, at: DateTime<Utc>) -> bool {
    if loan.returned {
        return false;
    }
    loan.returned = true;
    loan.returned_at = Some(at);
    true
}

/// Whether none of the given loans is still active
pub fn can_delete(loans: &[Loan]) -> bool {
    !loans.iter().any(Loan::is_active)
}

/// Deletion guard shared by books and users
pub fn ensure_no_active_loans(active_loans: i64, subject: &str) -> AppResult<()> {
    if active_loans > 0 {
        return Err(AppError::Conflict(format!(
            "{} has {} active loan(s)",
            subject, active_loans
        )));
    }
    Ok(())
}

/// Build the loan row for a borrow starting `today`
pub fn new_loan(user_id: i32, book_id: i32, today: NaiveDate, days: i64) -> AppResult<NewLoan> {
    let due_date = u64::try_from(days)
        .ok()
        .and_then(|d| today.checked_add_days(Days::new(d)))
        .ok_or_else(|| AppError::Validation(format!("Invalid loan duration: {} days", days)))?;

    Ok(NewLoan {
        user_id,
        book_id,
        loan_date: today,
        due_date,
    })
}
