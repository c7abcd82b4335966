//! Recipe endpoints

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{error, info, warn};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    serializers::{
        RecipeDetailResponse, RecipeImageResponse, RecipePayload, RecipeQuery, RecipeResponse,
    },
    state::AppState,
    storage::recipe_image_file_path,
};

/// List the caller's recipes, optionally filtered by tag and ingredient IDs
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RecipeQuery>,
) -> ApiResult<Json<Vec<RecipeResponse>>> {
    let filter = query.into_filter()?;
    let recipes = state.recipes.list_recipes(user.id, &filter).await?;

    Ok(Json(recipes.iter().map(RecipeResponse::from).collect()))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let recipe = state
        .recipes
        .get_recipe(user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(RecipeDetailResponse::from(&recipe)))
}

/// Create a recipe owned by the caller
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<RecipePayload>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let new_recipe = payload.into_new_recipe()?;
    let recipe = state.recipes.create_recipe(user.id, new_recipe).await?;
    info!("User {} created recipe {} ({})", user.email, recipe.id, recipe);

    Ok((StatusCode::CREATED, Json(RecipeDetailResponse::from(&recipe))))
}

/// Full update; title, time_minutes and price must be present
pub async fn replace_recipe(
    state: State<AppState>,
    user: Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<RecipePayload>, ApiError>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    apply_update(state, user, id, payload, true).await
}

/// Partial update
pub async fn update_recipe(
    state: State<AppState>,
    user: Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<RecipePayload>, ApiError>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    apply_update(state, user, id, payload, false).await
}

async fn apply_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: i64,
    payload: RecipePayload,
    require_all: bool,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let changes = payload.into_changes(require_all)?;
    let recipe = state
        .recipes
        .update_recipe(user.id, id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(RecipeDetailResponse::from(&recipe)))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    if !state.recipes.delete_recipe(user.id, id).await? {
        return Err(ApiError::NotFound);
    }
    info!("User {} deleted recipe {}", user.email, id);

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an image to a recipe from the multipart `image` field
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RecipeImageResponse>> {
    if state.recipes.get_recipe(user.id, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No image was submitted".to_string()))?;

    if let Err(e) = image::load_from_memory(&bytes) {
        warn!("Rejected upload for recipe {}: {}", id, e);
        return Err(ApiError::BadRequest(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_string(),
        ));
    }

    let relative = recipe_image_file_path(&filename);
    state.media.save(&relative, &bytes).await.map_err(|e| {
        error!("Failed to store image for recipe {}: {}", id, e);
        ApiError::InternalServerError
    })?;

    let recipe = match state.recipes.set_recipe_image(user.id, id, &relative).await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => {
            state.media.remove(&relative).await;
            return Err(ApiError::NotFound);
        }
        Err(e) => {
            state.media.remove(&relative).await;
            return Err(e.into());
        }
    };
    info!("User {} uploaded image {} for recipe {}", user.email, relative, id);

    Ok(Json(RecipeImageResponse::from(&recipe)))
}
