use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireManager, RequireStaff};
use crate::server::AppState;
use crate::server::dto::{CreateMedicineRequest, ListMedicinesParams, UpdateMedicineRequest};
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_non_negative_money, validate_required, validate_sku};
use crate::store::Store;
use crate::types::NewMedicine;

fn require_category(store: &dyn Store, category_id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        store
            .get_category(id)
            .api_err("Failed to check category")?
            .ok_or_else(|| ApiError::bad_request(format!("Category {id} does not exist")))?;
    }
    Ok(())
}

pub async fn list_medicines(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListMedicinesParams>,
) -> impl IntoResponse {
    let medicines = state
        .store
        .list_medicines(params.active == Some(true))
        .api_err("Failed to list medicines")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(medicines)))
}

pub async fn create_medicine(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateMedicineRequest>,
) -> impl IntoResponse {
    validate_required(&req.name, "name")?;
    validate_sku(&req.sku)?;
    validate_non_negative_money(req.price, "price")?;

    let store = state.store.as_ref();
    require_category(store, req.category_id)?;

    if store
        .get_medicine_by_sku(&req.sku)
        .api_err("Failed to check SKU")?
        .is_some()
    {
        return Err(ApiError::conflict("SKU already exists"));
    }

    let medicine = store
        .create_medicine(&NewMedicine {
            name: req.name.trim().to_string(),
            sku: req.sku,
            category_id: req.category_id,
            description: req.description,
            dosage: req.dosage,
            manufacturer: req.manufacturer,
            price: req.price,
            requires_prescription: req.requires_prescription,
            is_active: req.is_active.unwrap_or(true),
        })
        .api_err("Failed to create medicine")?;

    tracing::info!(sku = %medicine.sku, "Created medicine");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(medicine))))
}

pub async fn get_medicine(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let medicine = state
        .store
        .get_medicine(id)
        .api_err("Failed to get medicine")?
        .or_not_found("Medicine not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(medicine)))
}

pub async fn update_medicine(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateMedicineRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut medicine = store
        .get_medicine(id)
        .api_err("Failed to get medicine")?
        .or_not_found("Medicine not found")?;

    if let Some(name) = req.name {
        validate_required(&name, "name")?;
        medicine.name = name.trim().to_string();
    }
    if let Some(sku) = req.sku {
        validate_sku(&sku)?;
        let taken = store
            .get_medicine_by_sku(&sku)
            .api_err("Failed to check SKU")?
            .is_some_and(|other| other.id != medicine.id);
        if taken {
            return Err(ApiError::conflict("SKU already exists"));
        }
        medicine.sku = sku;
    }
    if let Some(category_id) = req.category_id {
        require_category(store, Some(category_id))?;
        medicine.category_id = Some(category_id);
    }
    if let Some(price) = req.price {
        validate_non_negative_money(price, "price")?;
        medicine.price = price;
    }
    if req.description.is_some() {
        medicine.description = req.description;
    }
    if req.dosage.is_some() {
        medicine.dosage = req.dosage;
    }
    if req.manufacturer.is_some() {
        medicine.manufacturer = req.manufacturer;
    }
    if let Some(flag) = req.requires_prescription {
        medicine.requires_prescription = flag;
    }
    if let Some(active) = req.is_active {
        medicine.is_active = active;
    }

    store
        .update_medicine(&medicine)
        .api_err("Failed to update medicine")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(medicine)))
}

pub async fn delete_medicine(
    _manager: RequireManager,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_medicine(id)
        .api_err("Failed to delete medicine")?;

    if !deleted {
        return Err(ApiError::not_found("Medicine not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
