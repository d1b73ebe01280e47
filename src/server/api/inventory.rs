use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{RequireAuth, RequireStaff};
use crate::server::AppState;
use crate::server::dto::{
    AdjustStockRequest, BatchResponse, CreateBatchRequest, ExpiringParams, ListInventoryParams,
    UpdateBatchRequest,
};
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    validate_non_negative, validate_non_negative_money, validate_positive, validate_required,
};
use crate::types::{InventoryBatch, NewBatch};

const DEFAULT_EXPIRING_DAYS: i64 = 30;
const MAX_EXPIRING_DAYS: i64 = 3650;

fn to_responses(batches: Vec<InventoryBatch>) -> Vec<BatchResponse> {
    batches.into_iter().map(BatchResponse::from).collect()
}

pub async fn list_batches(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListInventoryParams>,
) -> impl IntoResponse {
    let batches = state
        .store
        .list_batches(params.medicine_id)
        .api_err("Failed to list inventory")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_responses(batches))))
}

pub async fn list_low_stock(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let batches = state
        .store
        .list_low_stock()
        .api_err("Failed to list low stock")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_responses(batches))))
}

pub async fn list_expiring(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ExpiringParams>,
) -> impl IntoResponse {
    let days = params.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    if !(0..=MAX_EXPIRING_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 0 and {MAX_EXPIRING_DAYS}"
        )));
    }

    let now = Utc::now();
    let batches = state
        .store
        .list_expiring(now, now + Duration::days(days))
        .api_err("Failed to list expiring stock")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_responses(batches))))
}

pub async fn create_batch(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateBatchRequest>,
) -> impl IntoResponse {
    validate_required(&req.batch_number, "batch_number")?;
    validate_non_negative(req.quantity, "quantity")?;
    validate_non_negative_money(req.cost_price, "cost_price")?;
    let min_stock_level = req.min_stock_level.unwrap_or(state.config.low_stock_default);
    validate_non_negative(min_stock_level, "min_stock_level")?;

    let store = state.store.as_ref();
    store
        .get_medicine(req.medicine_id)
        .api_err("Failed to check medicine")?
        .or_not_found("Medicine not found")?;

    let batch = store
        .create_batch(&NewBatch {
            medicine_id: req.medicine_id,
            batch_number: req.batch_number.trim().to_string(),
            quantity: req.quantity,
            min_stock_level,
            expiry_date: req.expiry_date,
            cost_price: req.cost_price,
        })
        .api_err("Failed to create batch")?;

    tracing::info!(
        medicine_id = batch.medicine_id,
        batch = %batch.batch_number,
        quantity = batch.quantity,
        "Received stock"
    );

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(BatchResponse::from(batch))),
    ))
}

pub async fn get_batch(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let batch = state
        .store
        .get_batch(id)
        .api_err("Failed to get batch")?
        .or_not_found("Inventory batch not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(BatchResponse::from(batch))))
}

pub async fn update_batch(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateBatchRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut batch = store
        .get_batch(id)
        .api_err("Failed to get batch")?
        .or_not_found("Inventory batch not found")?;

    if let Some(number) = req.batch_number {
        validate_required(&number, "batch_number")?;
        batch.batch_number = number.trim().to_string();
    }
    if let Some(quantity) = req.quantity {
        validate_non_negative(quantity, "quantity")?;
        batch.quantity = quantity;
    }
    if let Some(level) = req.min_stock_level {
        validate_non_negative(level, "min_stock_level")?;
        batch.min_stock_level = level;
    }
    if let Some(expiry) = req.expiry_date {
        batch.expiry_date = expiry;
    }
    if let Some(cost) = req.cost_price {
        validate_non_negative_money(cost, "cost_price")?;
        batch.cost_price = cost;
    }

    store.update_batch(&batch).api_err("Failed to update batch")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(BatchResponse::from(batch))))
}

pub async fn adjust_batch(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<AdjustStockRequest>,
) -> impl IntoResponse {
    if req.delta == 0 {
        return Err(ApiError::bad_request("delta cannot be zero"));
    }
    validate_positive(req.delta.saturating_abs(), "delta")?;

    let batch = state
        .store
        .adjust_batch_quantity(id, req.delta)
        .api_err("Failed to adjust stock")?;

    tracing::info!(
        batch_id = id,
        delta = req.delta,
        reason = req.reason.as_deref().unwrap_or("-"),
        by = %actor.username,
        "Adjusted stock"
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(BatchResponse::from(batch))))
}
