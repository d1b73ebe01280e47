use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::{RequireAuth, RequireManager};
use crate::server::AppState;
use crate::server::dto::{CreateDiscountRequest, UpdateDiscountRequest};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_non_negative_money, validate_required};
use crate::store::Store;
use crate::types::{Discount, DiscountKind, Money, NewDiscount};

const MAX_PERCENTAGE: Money = Money::from_cents(100_00);

/// Checks the rules shared by creation and update on the final field values.
fn validate_discount(store: &dyn Store, d: &NewDiscount) -> Result<(), ApiError> {
    validate_required(&d.name, "name")?;
    if d.value <= Money::ZERO {
        return Err(ApiError::bad_request("value must be greater than zero"));
    }
    if d.kind == DiscountKind::Percentage && d.value > MAX_PERCENTAGE {
        return Err(ApiError::bad_request("A percentage discount cannot exceed 100"));
    }
    if d.valid_from >= d.valid_to {
        return Err(ApiError::bad_request("valid_from must be before valid_to"));
    }
    if let Some(min) = d.min_order_amount {
        validate_non_negative_money(min, "min_order_amount")?;
    }
    if let Some(max) = d.max_discount_amount {
        validate_non_negative_money(max, "max_discount_amount")?;
    }
    if let Some(medicine_id) = d.applicable_to_medicine_id {
        store
            .get_medicine(medicine_id)
            .api_err("Failed to check medicine")?
            .ok_or_else(|| ApiError::bad_request(format!("Medicine {medicine_id} does not exist")))?;
    }
    Ok(())
}

pub async fn list_discounts(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let discounts = state
        .store
        .list_discounts()
        .api_err("Failed to list discounts")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(discounts)))
}

pub async fn list_active_discounts(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let discounts = state
        .store
        .list_active_discounts(Utc::now())
        .api_err("Failed to list active discounts")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(discounts)))
}

pub async fn create_discount(
    RequireManager(actor): RequireManager,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateDiscountRequest>,
) -> impl IntoResponse {
    let new = NewDiscount {
        name: req.name.trim().to_string(),
        kind: req.kind,
        value: req.value,
        applicable_to_medicine_id: req.applicable_to_medicine_id,
        min_order_amount: req.min_order_amount,
        max_discount_amount: req.max_discount_amount,
        valid_from: req.valid_from,
        valid_to: req.valid_to,
        is_active: req.is_active.unwrap_or(true),
    };

    let store = state.store.as_ref();
    validate_discount(store, &new)?;

    let discount = store
        .create_discount(&new)
        .api_err("Failed to create discount")?;

    tracing::info!(name = %discount.name, by = %actor.username, "Created discount");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(discount))))
}

pub async fn get_discount(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let discount = state
        .store
        .get_discount(id)
        .api_err("Failed to get discount")?
        .or_not_found("Discount not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(discount)))
}

pub async fn update_discount(
    _manager: RequireManager,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateDiscountRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let current = store
        .get_discount(id)
        .api_err("Failed to get discount")?
        .or_not_found("Discount not found")?;

    let merged = NewDiscount {
        name: req.name.map_or(current.name, |n| n.trim().to_string()),
        kind: req.kind.unwrap_or(current.kind),
        value: req.value.unwrap_or(current.value),
        applicable_to_medicine_id: req
            .applicable_to_medicine_id
            .or(current.applicable_to_medicine_id),
        min_order_amount: req.min_order_amount.or(current.min_order_amount),
        max_discount_amount: req.max_discount_amount.or(current.max_discount_amount),
        valid_from: req.valid_from.unwrap_or(current.valid_from),
        valid_to: req.valid_to.unwrap_or(current.valid_to),
        is_active: req.is_active.unwrap_or(current.is_active),
    };
    validate_discount(store, &merged)?;

    let discount = Discount {
        id,
        name: merged.name,
        kind: merged.kind,
        value: merged.value,
        applicable_to_medicine_id: merged.applicable_to_medicine_id,
        min_order_amount: merged.min_order_amount,
        max_discount_amount: merged.max_discount_amount,
        valid_from: merged.valid_from,
        valid_to: merged.valid_to,
        is_active: merged.is_active,
    };
    store
        .update_discount(&discount)
        .api_err("Failed to update discount")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(discount)))
}

pub async fn delete_discount(
    _manager: RequireManager,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_discount(id)
        .api_err("Failed to delete discount")?;

    if !deleted {
        return Err(ApiError::not_found("Discount not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
