use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    DiscountKind, InventoryBatch, Money, PaymentMethod, PrescriptionStatus, Role, SaleStatus,
    StockStatus,
};

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_date_or_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn de_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_date_or_datetime(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'")))
}

fn de_opt_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_date_or_datetime(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
        None => Ok(None),
    }
}

// Auth and users

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    #[serde(default)]
    pub role: Option<String>,
}

// Catalogue

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMedicineRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub requires_prescription: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMedicinesParams {
    #[serde(default)]
    pub active: Option<bool>,
}

// Inventory

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i64,
    #[serde(default)]
    pub min_stock_level: Option<i64>,
    #[serde(deserialize_with = "de_datetime")]
    pub expiry_date: DateTime<Utc>,
    pub cost_price: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBatchRequest {
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub min_stock_level: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cost_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInventoryParams {
    #[serde(default)]
    pub medicine_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiringParams {
    #[serde(default)]
    pub days: Option<i64>,
}

/// A batch with its derived stock status.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    #[serde(flatten)]
    pub batch: InventoryBatch,
    pub stock_status: StockStatus,
}

impl From<InventoryBatch> for BatchResponse {
    fn from(batch: InventoryBatch) -> Self {
        let stock_status = batch.stock_status();
        Self {
            batch,
            stock_status,
        }
    }
}

// Prescriptions

#[derive(Debug, Deserialize)]
pub struct PrescriptionItemRequest {
    pub medicine_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub dosage_instructions: String,
}

/// Any `status` sent by the client is ignored; prescriptions start pending.
#[derive(Debug, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub customer_id: i64,
    pub prescription_number: String,
    pub doctor_name: String,
    #[serde(deserialize_with = "de_datetime")]
    pub issued_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<PrescriptionItemRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePrescriptionRequest {
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub issued_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<PrescriptionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionStatusRequest {
    pub status: PrescriptionStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPrescriptionsParams {
    #[serde(default)]
    pub status: Option<PrescriptionStatus>,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

// Sales

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub medicine_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub inventory_id: Option<i64>,
}

/// Totals are always computed server-side; any sent by the client are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub prescription_id: Option<i64>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub sale_number: Option<String>,
    #[serde(default)]
    pub status: Option<SaleStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SaleStatusRequest {
    pub status: SaleStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSalesParams {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

// Discounts

#[derive(Debug, Deserialize)]
pub struct CreateDiscountRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: Money,
    #[serde(default)]
    pub applicable_to_medicine_id: Option<i64>,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    #[serde(default)]
    pub max_discount_amount: Option<Money>,
    #[serde(deserialize_with = "de_datetime")]
    pub valid_from: DateTime<Utc>,
    #[serde(deserialize_with = "de_datetime")]
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDiscountRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<DiscountKind>,
    #[serde(default)]
    pub value: Option<Money>,
    #[serde(default)]
    pub applicable_to_medicine_id: Option<i64>,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    #[serde(default)]
    pub max_discount_amount: Option<Money>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
