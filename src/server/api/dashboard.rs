use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn stats(_auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state
        .store
        .dashboard_stats(Utc::now())
        .api_err("Failed to compute dashboard stats")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(stats)))
}
