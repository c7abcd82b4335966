//! Application state shared across handlers

use common::jwt::JwtService;
use std::sync::Arc;

use crate::{repositories::RecipeRepository, storage::MediaStorage};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<dyn RecipeRepository>,
    pub jwt_service: JwtService,
    pub media: MediaStorage,
}
