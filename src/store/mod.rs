mod checkout;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::*;

/// Filters for listing prescriptions. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrescriptionFilter {
    pub status: Option<PrescriptionStatus>,
    pub customer_id: Option<i64>,
}

/// Filters for listing sales. `date` is a UTC calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaleFilter {
    pub date: Option<NaiveDate>,
    pub customer_id: Option<i64>,
}

/// A prescription status change and who made it.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub to: PrescriptionStatus,
    pub actor_id: i64,
    pub at: DateTime<Utc>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users_by_role(&self, role: Role) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn set_user_active(&self, id: i64, is_active: bool) -> Result<bool>;
    fn has_manager(&self) -> Result<bool>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn touch_session(&self, id: &str) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_user_sessions(&self, user_id: i64) -> Result<usize>;
    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // Category operations
    fn create_category(&self, category: &NewCategory) -> Result<Category>;
    fn get_category(&self, id: i64) -> Result<Option<Category>>;
    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn list_categories(&self) -> Result<Vec<Category>>;

    // Medicine operations
    fn create_medicine(&self, medicine: &NewMedicine) -> Result<Medicine>;
    fn get_medicine(&self, id: i64) -> Result<Option<Medicine>>;
    fn get_medicine_by_sku(&self, sku: &str) -> Result<Option<Medicine>>;
    fn list_medicines(&self, active_only: bool) -> Result<Vec<Medicine>>;
    fn update_medicine(&self, medicine: &Medicine) -> Result<()>;
    /// Refuses with a conflict while any batch, prescription item, sale item
    /// or discount still points at the medicine.
    fn delete_medicine(&self, id: i64) -> Result<bool>;

    // Inventory operations
    fn create_batch(&self, batch: &NewBatch) -> Result<InventoryBatch>;
    fn get_batch(&self, id: i64) -> Result<Option<InventoryBatch>>;
    fn list_batches(&self, medicine_id: Option<i64>) -> Result<Vec<InventoryBatch>>;
    fn update_batch(&self, batch: &InventoryBatch) -> Result<()>;
    fn adjust_batch_quantity(&self, id: i64, delta: i64) -> Result<InventoryBatch>;
    fn list_low_stock(&self) -> Result<Vec<InventoryBatch>>;
    fn list_expiring(&self, now: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<InventoryBatch>>;

    // Prescription operations
    fn create_prescription(&self, prescription: &NewPrescription) -> Result<PrescriptionDetail>;
    fn get_prescription(&self, id: i64) -> Result<Option<Prescription>>;
    fn list_prescriptions(&self, filter: PrescriptionFilter) -> Result<Vec<Prescription>>;
    fn list_prescription_items(&self, prescription_id: i64) -> Result<Vec<PrescriptionItem>>;
    /// Saves doctor, notes and issue date, then applies `change` if given.
    /// Both writes share one transaction. Only pending prescriptions are editable.
    fn update_prescription(
        &self,
        prescription: &Prescription,
        change: Option<StatusChange>,
    ) -> Result<Prescription>;
    fn transition_prescription(
        &self,
        id: i64,
        to: PrescriptionStatus,
        actor_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Prescription>;

    // Sale operations
    fn record_sale(&self, sale: &NewSale) -> Result<SaleDetail>;
    fn get_sale(&self, id: i64) -> Result<Option<Sale>>;
    fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>>;
    fn list_sale_items(&self, sale_id: i64) -> Result<Vec<SaleItem>>;
    fn transition_sale(&self, id: i64, to: SaleStatus) -> Result<Sale>;
    fn delete_sale(&self, id: i64) -> Result<bool>;

    // Discount operations
    fn create_discount(&self, discount: &NewDiscount) -> Result<Discount>;
    fn get_discount(&self, id: i64) -> Result<Option<Discount>>;
    fn list_discounts(&self) -> Result<Vec<Discount>>;
    fn list_active_discounts(&self, now: DateTime<Utc>) -> Result<Vec<Discount>>;
    fn update_discount(&self, discount: &Discount) -> Result<()>;
    fn delete_discount(&self, id: i64) -> Result<bool>;

    fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats>;

    fn close(&self) -> Result<()>;
}
