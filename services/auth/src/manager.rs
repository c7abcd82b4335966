//! User store: the factory for users and the credential check
//!
//! All user creation goes through [`UserManager`], which normalizes the email,
//! hashes the password with argon2 and hands a ready record to the
//! repository.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::error::DatabaseError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{ExtraFields, NewUser, User};
use crate::repositories::UserRepository;

/// Errors raised by the user store
#[derive(Error, Debug)]
pub enum UserStoreError {
    /// Input rejected before anything was written
    #[error("{0}")]
    Validation(String),

    /// Another user already owns this email
    #[error("A user with this email already exists")]
    EmailTaken,

    /// Password hashing failed
    #[error("Failed to hash password: {0}")]
    PasswordHash(String),

    /// Storage failure
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for UserStoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => UserStoreError::EmailTaken,
            other => UserStoreError::Database(other),
        }
    }
}

/// Normalize an email by lower-casing the domain part
///
/// Only the text after the last `@` changes; the local part is kept verbatim.
/// Input without `@` is returned unchanged.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserStoreError::PasswordHash(e.to_string()))
}

/// Verify a password against the user's stored hash
pub fn check_password(user: &User, password: &str) -> bool {
    match PasswordHash::new(&user.password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// User manager over a user repository
#[derive(Clone)]
pub struct UserManager {
    repository: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create a new user manager
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Create and persist a regular user
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> Result<User, UserStoreError> {
        if email.trim().is_empty() {
            return Err(UserStoreError::Validation(
                "Users must have an email address".to_string(),
            ));
        }

        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let user = self
            .repository
            .insert(NewUser {
                email,
                password_hash,
                name: extra.name,
                is_active: extra.is_active,
                is_staff: extra.is_staff,
                is_superuser: extra.is_superuser,
            })
            .await?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    /// Create and persist a superuser
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User, UserStoreError> {
        self.create_user(
            email,
            password,
            ExtraFields {
                is_staff: true,
                is_superuser: true,
                ..ExtraFields::default()
            },
        )
        .await
    }

    /// Return the active user matching these credentials
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let email = normalize_email(email);
        let user = self.repository.find_by_email(&email).await?;

        Ok(user.filter(|u| u.is_active && check_password(u, password)))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        Ok(self.repository.find_by_id(id).await?)
    }
}
