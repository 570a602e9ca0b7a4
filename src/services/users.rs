//! Borrower management service

use std::sync::Arc;

use validator::Validate;

use super::loans::LoansService;
use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User},
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
    loans: LoansService,
}

impl UsersService {
    pub fn new(users: Arc<dyn UserStore>, loans: LoansService) -> Self {
        Self { users, loans }
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.users.list_users().await
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.users.get_user(id).await
    }

    pub async fn create_user(&self, request: &CreateUser) -> AppResult<User> {
        request.validate()?;
        self.users.create_user(request).await
    }

    pub async fn update_user(&self, id: i32, request: &UpdateUser) -> AppResult<User> {
        request.validate()?;
        self.users.update_user(id, request).await
    }

    /// Delete a user holding no active loan
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        if !self.loans.can_delete_user(id).await? {
            tracing::warn!("Refusing to delete user {}: active loans", id);
            return Err(AppError::Conflict(format!(
                "User {} cannot be deleted while holding loans",
                id
            )));
        }

        self.users.delete_user(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }
}
