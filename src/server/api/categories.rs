use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireStaff};
use crate::server::AppState;
use crate::server::dto::CreateCategoryRequest;
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_required;
use crate::types::NewCategory;

pub async fn list_categories(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = state
        .store
        .list_categories()
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}

pub async fn create_category(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> impl IntoResponse {
    validate_required(&req.name, "name")?;
    let name = req.name.trim().to_string();

    let store = state.store.as_ref();
    if store
        .get_category_by_name(&name)
        .api_err("Failed to check category")?
        .is_some()
    {
        return Err(ApiError::conflict("Category already exists"));
    }

    let category = store
        .create_category(&NewCategory {
            name,
            description: req.description,
        })
        .api_err("Failed to create category")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

pub async fn get_category(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let category = state
        .store
        .get_category(id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(category)))
}
