//! Application state shared across handlers

use common::jwt::JwtService;

use crate::{manager::UserManager, rate_limiter::RateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserManager,
    pub jwt_service: JwtService,
    pub rate_limiter: RateLimiter,
}
