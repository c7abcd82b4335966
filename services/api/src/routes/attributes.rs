//! Tag and ingredient endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::AttributeKind,
    serializers::{AttributePayload, AttributeQuery, AttributeResponse},
    state::AppState,
};

pub async fn list_attributes(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AttributeQuery>,
) -> ApiResult<Json<Vec<AttributeResponse>>> {
    let assigned_only = query.assigned_only()?;
    let attributes = state
        .recipes
        .list_attributes(kind, user.id, assigned_only)
        .await?;

    Ok(Json(attributes.iter().map(AttributeResponse::from).collect()))
}

pub async fn get_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<AttributeResponse>> {
    let attribute = state
        .recipes
        .get_attribute(kind, user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(AttributeResponse::from(&attribute)))
}

pub async fn replace_attribute(
    state: State<AppState>,
    kind: Extension<AttributeKind>,
    user: Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<AttributePayload>, ApiError>,
) -> ApiResult<Json<AttributeResponse>> {
    rename(state, kind, user, id, payload, false).await
}

pub async fn update_attribute(
    state: State<AppState>,
    kind: Extension<AttributeKind>,
    user: Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<AttributePayload>, ApiError>,
) -> ApiResult<Json<AttributeResponse>> {
    rename(state, kind, user, id, payload, true).await
}

async fn rename(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(user): Extension<AuthUser>,
    id: i64,
    payload: AttributePayload,
    partial: bool,
) -> ApiResult<Json<AttributeResponse>> {
    let attribute = match payload.into_name(partial)? {
        Some(name) => state.recipes.rename_attribute(kind, user.id, id, name).await?,
        None => state.recipes.get_attribute(kind, user.id, id).await?,
    }
    .ok_or(ApiError::NotFound)?;

    Ok(Json(AttributeResponse::from(&attribute)))
}

/// Delete a tag or ingredient; recipes using it lose the link
pub async fn delete_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    if !state.recipes.delete_attribute(kind, user.id, id).await? {
        return Err(ApiError::NotFound);
    }
    info!("User {} deleted {} {}", user.email, kind.label(), id);

    Ok(StatusCode::NO_CONTENT)
}
