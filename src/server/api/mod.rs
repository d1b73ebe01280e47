mod auth;
mod categories;
mod dashboard;
mod discounts;
mod inventory;
mod medicines;
mod prescriptions;
mod sales;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user).patch(users::update_user))
        .route("/users/{id}/status", patch(users::set_user_status))
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/{id}", get(categories::get_category))
        // Medicines
        .route(
            "/medicines",
            get(medicines::list_medicines).post(medicines::create_medicine),
        )
        .route(
            "/medicines/{id}",
            get(medicines::get_medicine)
                .put(medicines::update_medicine)
                .delete(medicines::delete_medicine),
        )
        // Inventory
        .route(
            "/inventory",
            get(inventory::list_batches).post(inventory::create_batch),
        )
        .route("/inventory/low-stock", get(inventory::list_low_stock))
        .route("/inventory/expiring", get(inventory::list_expiring))
        .route(
            "/inventory/{id}",
            get(inventory::get_batch).patch(inventory::update_batch),
        )
        .route("/inventory/{id}/adjust", post(inventory::adjust_batch))
        // Prescriptions
        .route(
            "/prescriptions",
            get(prescriptions::list_prescriptions).post(prescriptions::create_prescription),
        )
        .route(
            "/prescriptions/{id}",
            get(prescriptions::get_prescription).put(prescriptions::update_prescription),
        )
        .route(
            "/prescriptions/{id}/status",
            post(prescriptions::set_prescription_status),
        )
        // Sales
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/sales/{id}",
            get(sales::get_sale)
                .put(sales::update_sale_status)
                .delete(sales::delete_sale),
        )
        // Discounts
        .route(
            "/discounts",
            get(discounts::list_discounts).post(discounts::create_discount),
        )
        .route("/discounts/active", get(discounts::list_active_discounts))
        .route(
            "/discounts/{id}",
            get(discounts::get_discount)
                .patch(discounts::update_discount)
                .delete(discounts::delete_discount),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::stats))
}
