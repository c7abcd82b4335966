//! Authentication service models

pub mod user;

// Re-export for convenience
pub use user::{
    CreateUserRequest, ExtraFields, LoginCredentials, NewUser, TokenResponse, User, UserResponse,
};
