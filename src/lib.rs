//! Bibliotheca Library Circulation Server
//!
//! A REST JSON API for a community library: catalog (books, authors,
//! categories, publishers), borrowers, and loans with consistent
//! availability counts.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
