use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::{RequireAuth, RequireStaff};
use crate::server::AppState;
use crate::server::dto::{
    CreatePrescriptionRequest, ListPrescriptionsParams, PrescriptionStatusRequest,
    UpdatePrescriptionRequest,
};
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_positive, validate_required};
use crate::store::{PrescriptionFilter, StatusChange};
use crate::types::{NewPrescription, NewPrescriptionItem, PrescriptionDetail, User};

fn load_detail(state: &AppState, id: i64) -> Result<PrescriptionDetail, ApiError> {
    let prescription = state
        .store
        .get_prescription(id)
        .api_err("Failed to get prescription")?
        .or_not_found("Prescription not found")?;
    let items = state
        .store
        .list_prescription_items(id)
        .api_err("Failed to get prescription items")?;

    Ok(PrescriptionDetail {
        prescription,
        items,
    })
}

/// Customers may only see prescriptions issued to them.
fn ensure_visible(actor: &User, customer_id: i64) -> Result<(), ApiError> {
    if actor.role.is_staff() || actor.id == customer_id {
        Ok(())
    } else {
        Err(ApiError::not_found("Prescription not found"))
    }
}

pub async fn list_prescriptions(
    RequireAuth(actor): RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListPrescriptionsParams>,
) -> impl IntoResponse {
    let customer_id = if actor.role.is_staff() {
        params.customer_id
    } else {
        Some(actor.id)
    };

    let prescriptions = state
        .store
        .list_prescriptions(PrescriptionFilter {
            status: params.status,
            customer_id,
        })
        .api_err("Failed to list prescriptions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(prescriptions)))
}

pub async fn create_prescription(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePrescriptionRequest>,
) -> impl IntoResponse {
    validate_required(&req.prescription_number, "prescription_number")?;
    validate_required(&req.doctor_name, "doctor_name")?;
    if req.items.is_empty() {
        return Err(ApiError::bad_request("A prescription needs at least one item"));
    }

    let mut items = Vec::with_capacity(req.items.len());
    for item in req.items {
        validate_positive(item.quantity, "quantity")?;
        items.push(NewPrescriptionItem {
            medicine_id: item.medicine_id,
            quantity: item.quantity,
            dosage_instructions: item.dosage_instructions,
        });
    }

    let detail = state
        .store
        .create_prescription(&NewPrescription {
            customer_id: req.customer_id,
            prescription_number: req.prescription_number.trim().to_string(),
            doctor_name: req.doctor_name.trim().to_string(),
            notes: req.notes,
            issued_date: req.issued_date,
            items,
        })
        .api_err("Failed to create prescription")?;

    tracing::info!(
        number = %detail.prescription.prescription_number,
        customer_id = detail.prescription.customer_id,
        by = %actor.username,
        "Recorded prescription"
    );

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

pub async fn get_prescription(
    RequireAuth(actor): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let detail = load_detail(&state, id)?;
    ensure_visible(&actor, detail.prescription.customer_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn update_prescription(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdatePrescriptionRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut prescription = store
        .get_prescription(id)
        .api_err("Failed to get prescription")?
        .or_not_found("Prescription not found")?;

    let change = req
        .status
        .filter(|s| *s != prescription.status)
        .map(|to| StatusChange {
            to,
            actor_id: actor.id,
            at: Utc::now(),
        });

    let edits_fields =
        req.doctor_name.is_some() || req.notes.is_some() || req.issued_date.is_some();
    if edits_fields {
        if let Some(doctor) = req.doctor_name {
            validate_required(&doctor, "doctor_name")?;
            prescription.doctor_name = doctor.trim().to_string();
        }
        if req.notes.is_some() {
            prescription.notes = req.notes;
        }
        if let Some(issued) = req.issued_date {
            prescription.issued_date = issued;
        }
        store
            .update_prescription(&prescription, change)
            .api_err("Failed to update prescription")?;
    } else if let Some(change) = change {
        store
            .transition_prescription(id, change.to, change.actor_id, change.at)
            .api_err("Failed to update prescription status")?;
    }

    let detail = load_detail(&state, id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn set_prescription_status(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<PrescriptionStatusRequest>,
) -> impl IntoResponse {
    let prescription = state
        .store
        .transition_prescription(id, req.status, actor.id, Utc::now())
        .api_err("Failed to update prescription status")?;

    tracing::info!(
        prescription_id = id,
        status = %prescription.status,
        by = %actor.username,
        "Prescription status changed"
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(prescription)))
}
