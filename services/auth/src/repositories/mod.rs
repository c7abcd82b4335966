//! Repositories for user persistence

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewUser, User};

pub mod memory;
pub mod user;

pub use memory::InMemoryUserRepository;
pub use user::PgUserRepository;

/// Storage operations for users
///
/// Implementations report a duplicate email as
/// [`DatabaseError::Conflict`](common::error::DatabaseError::Conflict).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user
    async fn insert(&self, new_user: NewUser) -> DatabaseResult<User>;

    /// Find a user by exact (already normalized) email
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;
}
