use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rand::Rng;

use crate::auth::{RequireAuth, RequireManager, RequireStaff};
use crate::server::AppState;
use crate::server::dto::{CreateSaleRequest, ListSalesParams, SaleStatusRequest};
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_positive, validate_required};
use crate::store::SaleFilter;
use crate::types::{NewSale, NewSaleLine, SaleDetail, SaleStatus};

fn generate_sale_number() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("SALE-{}-{suffix}", Utc::now().timestamp_millis())
}

pub async fn list_sales(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListSalesParams>,
) -> impl IntoResponse {
    let sales = state
        .store
        .list_sales(SaleFilter {
            date: params.date,
            customer_id: params.customer_id,
        })
        .api_err("Failed to list sales")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(sales)))
}

pub async fn create_sale(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateSaleRequest>,
) -> impl IntoResponse {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("A sale needs at least one item"));
    }
    let status = req.status.unwrap_or(SaleStatus::Completed);
    if status == SaleStatus::Refunded {
        return Err(ApiError::bad_request("A sale cannot be created as refunded"));
    }

    let mut lines = Vec::with_capacity(req.items.len());
    for item in req.items {
        validate_positive(item.quantity, "quantity")?;
        lines.push(NewSaleLine {
            medicine_id: item.medicine_id,
            quantity: item.quantity,
            inventory_id: item.inventory_id,
        });
    }

    let sale_number = match req.sale_number {
        Some(number) => {
            validate_required(&number, "sale_number")?;
            number.trim().to_string()
        }
        None => generate_sale_number(),
    };

    let detail = state
        .store
        .record_sale(&NewSale {
            customer_id: req.customer_id,
            pharmacist_id: actor.id,
            prescription_id: req.prescription_id,
            sale_number,
            payment_method: req.payment_method,
            status,
            discount_id: req.discount_id,
            lines,
            tax_rate_bps: state.config.tax_rate_bps,
            created_at: Utc::now(),
        })
        .api_err("Failed to record sale")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

pub async fn get_sale(
    RequireAuth(actor): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let sale = state
        .store
        .get_sale(id)
        .api_err("Failed to get sale")?
        .or_not_found("Sale not found")?;

    if !actor.role.is_staff() && sale.customer_id != Some(actor.id) {
        return Err(ApiError::not_found("Sale not found"));
    }

    let items = state
        .store
        .list_sale_items(id)
        .api_err("Failed to get sale items")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(SaleDetail { sale, items })))
}

pub async fn update_sale_status(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<SaleStatusRequest>,
) -> impl IntoResponse {
    let sale = state
        .store
        .transition_sale(id, req.status)
        .api_err("Failed to update sale status")?;

    tracing::info!(
        sale = %sale.sale_number,
        status = %sale.status,
        by = %actor.username,
        "Sale status changed"
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(sale)))
}

pub async fn delete_sale(
    RequireManager(actor): RequireManager,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_sale(id)
        .api_err("Failed to delete sale")?;

    if !deleted {
        return Err(ApiError::not_found("Sale not found"));
    }

    tracing::info!(sale_id = id, by = %actor.username, "Deleted sale");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sale_numbers_have_prefix_and_suffix() {
        let number = generate_sale_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SALE");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
    }
}
