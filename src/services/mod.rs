//! Business logic services

pub mod catalog;
pub mod loans;
pub mod users;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::LibraryStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services on top of one store
    pub fn new<S>(store: Arc<S>, loans_config: LoansConfig) -> Self
    where
        S: LibraryStore + 'static,
    {
        let loans = loans::LoansService::new(store.clone(), store.clone(), loans_config);

        Self {
            catalog: catalog::CatalogService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                loans.clone(),
            ),
            users: users::UsersService::new(store, loans.clone()),
            loans,
        }
    }
}
