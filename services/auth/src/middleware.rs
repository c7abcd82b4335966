//! Middleware for JWT token validation and authentication

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::{error::AuthError, state::AppState};

/// Extract and validate the bearer token, storing its claims in the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::Unauthorized)?;

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        warn!("Rejected token: {}", e);
        AuthError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
