use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiscountKind, Money, PaymentMethod, PrescriptionStatus, Role, SaleStatus, StockStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

/// A server-side login session. The raw key lives only in the client cookie.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub key_lookup: String,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub price: Money,
    pub requires_prescription: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub sku: String,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub price: Money,
    pub requires_prescription: bool,
    pub is_active: bool,
}

/// One received lot of a medicine, tracked with its own expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryBatch {
    pub id: i64,
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub expiry_date: DateTime<Utc>,
    pub cost_price: Money,
    pub created_at: DateTime<Utc>,
}

impl InventoryBatch {
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.quantity, self.min_stock_level)
    }

    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expiry_date <= at
    }
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub medicine_id: i64,
    pub batch_number: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub expiry_date: DateTime<Utc>,
    pub cost_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub customer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacist_id: Option<i64>,
    pub prescription_number: String,
    pub doctor_name: String,
    pub status: PrescriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub issued_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispensed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medicine_id: i64,
    pub quantity: i64,
    pub dosage_instructions: String,
    pub dispensed_quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub items: Vec<PrescriptionItem>,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub customer_id: i64,
    pub prescription_number: String,
    pub doctor_name: String,
    pub notes: Option<String>,
    pub issued_date: DateTime<Utc>,
    pub items: Vec<NewPrescriptionItem>,
}

#[derive(Debug, Clone)]
pub struct NewPrescriptionItem {
    pub medicine_id: i64,
    pub quantity: i64,
    pub dosage_instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub pharmacist_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<i64>,
    pub sale_number: String,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub medicine_id: i64,
    pub inventory_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// A checkout request after input validation. Prices, batches and totals are
/// resolved by the store inside the sale transaction.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer_id: Option<i64>,
    pub pharmacist_id: i64,
    pub prescription_id: Option<i64>,
    pub sale_number: String,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub discount_id: Option<i64>,
    pub lines: Vec<NewSaleLine>,
    pub tax_rate_bps: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSaleLine {
    pub medicine_id: i64,
    pub quantity: i64,
    pub inventory_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    /// Percent for percentage discounts ("10.00" is 10%), an amount for fixed ones.
    pub value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_to_medicine_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Money>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
}

impl Discount {
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= at && at <= self.valid_to
    }
}

#[derive(Debug, Clone)]
pub struct NewDiscount {
    pub name: String,
    pub kind: DiscountKind,
    pub value: Money,
    pub applicable_to_medicine_id: Option<i64>,
    pub min_order_amount: Option<Money>,
    pub max_discount_amount: Option<Money>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_medicines: i64,
    pub low_stock_items: i64,
    pub todays_sales: Money,
    pub todays_prescriptions: i64,
    pub pending_prescriptions: i64,
    pub expiring_batches: i64,
}
