//! API service routes

use axum::{
    Extension, Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{middleware::auth_middleware, models::AttributeKind, state::AppState};

mod attributes;
mod recipes;
#[cfg(test)]
mod test_support;

/// Upper bound on an image upload request
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/recipes/",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/:id/",
            get(recipes::get_recipe)
                .put(recipes::replace_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/upload-image/",
            post(recipes::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .merge(attribute_routes("tags", AttributeKind::Tag))
        .merge(attribute_routes("ingredients", AttributeKind::Ingredient))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health-check/", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Tag and ingredient endpoints share handlers; the kind travels as an extension
fn attribute_routes(prefix: &str, kind: AttributeKind) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/{}/", prefix),
            get(attributes::list_attributes),
        )
        .route(
            &format!("/{}/:id/", prefix),
            get(attributes::get_attribute)
                .put(attributes::replace_attribute)
                .patch(attributes::update_attribute)
                .delete(attributes::delete_attribute),
        )
        .layer(Extension(kind))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "recipe-api"
    }))
}
