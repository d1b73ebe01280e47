use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use super::users::create_account;
use crate::auth::{
    MaybeAuth, RequireAuth, clear_session_cookie, end_session, session_cookie,
    session_key_from_headers, start_session,
};
use crate::server::AppState;
use crate::server::dto::{LoginRequest, RegisterRequest};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::Role;

pub async fn register(
    MaybeAuth(actor): MaybeAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> impl IntoResponse {
    let role = req.role.unwrap_or_default();
    let is_manager = actor.as_ref().is_some_and(|u| u.role == Role::Manager);

    if role.is_staff() && !is_manager {
        return Err(ApiError::forbidden("Only managers can create staff accounts"));
    }

    let user = create_account(&state, req, role)?;
    tracing::info!(username = %user.username, role = %user.role, "Registered account");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> impl IntoResponse {
    let (Some(username), Some(password)) = (
        req.username.filter(|u| !u.is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    if let Err(e) = state.store.purge_expired_sessions(Utc::now()) {
        tracing::warn!("Failed to purge expired sessions: {e}");
    }

    let user = state
        .store
        .get_user_by_username(&username)
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let valid = state
        .hasher
        .verify(&password, &user.password_hash)
        .api_err("Failed to verify password")?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }

    let key = start_session(&state, &user).api_err("Failed to create session")?;
    let cookie = session_cookie(
        &key,
        state.config.session_ttl().num_seconds(),
        state.config.secure_cookies,
    );

    tracing::info!(username = %user.username, "User logged in");

    Ok::<_, ApiError>(([(SET_COOKIE, cookie)], Json(ApiResponse::success(user))))
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(key) = session_key_from_headers(&headers) {
        if let Err(e) = end_session(&state, &key) {
            tracing::warn!("Failed to delete session on logout: {e}");
        }
    }

    (
        [(SET_COOKIE, clear_session_cookie(state.config.secure_cookies))],
        Json(ApiResponse::success(json!({ "message": "Logged out" }))),
    )
}

pub async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    Json(ApiResponse::success(user))
}
