//! Data models for Bibliotheca

pub mod author;
pub mod book;
pub mod category;
pub mod input;
pub mod loan;
pub mod publisher;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails};
pub use category::Category;
pub use loan::{Loan, LoanDetails, LoanFilter};
pub use publisher::Publisher;
pub use user::User;
