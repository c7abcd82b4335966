//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use common::jwt::Claims;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    manager::normalize_email,
    middleware::auth_middleware,
    models::{CreateUserRequest, ExtraFields, LoginCredentials, TokenResponse, UserResponse},
    state::AppState,
    validation::{validate_email, validate_name, validate_password},
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/users/me/", get(current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/users/", post(create_user))
        .route("/auth/token/", post(obtain_token))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateUserRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    validate_email(&payload.email).map_err(AuthError::BadRequest)?;
    validate_password(&payload.password).map_err(AuthError::BadRequest)?;
    let name = payload.name.unwrap_or_default();
    validate_name(&name).map_err(AuthError::BadRequest)?;

    let user = state
        .users
        .create_user(
            &payload.email,
            &payload.password,
            ExtraFields {
                name,
                ..ExtraFields::default()
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Exchange credentials for an access token
pub async fn obtain_token(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginCredentials>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let key = normalize_email(&payload.email);
    info!("Login attempt for user: {}", key);

    if !state.rate_limiter.is_allowed(&key).await {
        warn!("Login throttled for user: {}", key);
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| {
            AuthError::BadRequest("Unable to authenticate with provided credentials".to_string())
        })?;

    state.rate_limiter.reset(&key).await;

    let access_token = state
        .jwt_service
        .generate_access_token(user.id, &user.email, user.is_staff)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Return the authenticated user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(UserResponse::from(&user)))
}
