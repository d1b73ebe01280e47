use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireManager, RequireStaff};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ListUsersParams, RegisterRequest, UpdateUserRequest, UserStatusRequest};
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_email, validate_password, validate_required, validate_username};
use crate::types::{NewUser, Role, User};

/// Validates and stores a new account. Shared by registration and staff user creation.
pub(super) fn create_account(
    state: &AppState,
    req: RegisterRequest,
    role: Role,
) -> Result<User, ApiError> {
    validate_username(&req.username)?;
    validate_password(&req.password)?;
    validate_email(&req.email)?;
    validate_required(&req.full_name, "full_name")?;

    let password_hash = state
        .hasher
        .hash(&req.password)
        .api_err("Failed to hash password")?;

    // Uniqueness is enforced by the insert; the lookup only picks the message.
    let store = state.store.as_ref();
    let username = req.username.clone();
    match store.create_user(&NewUser {
        username: req.username,
        password_hash,
        email: req.email,
        full_name: req.full_name.trim().to_string(),
        phone: req.phone,
        address: req.address,
        role,
    }) {
        Err(Error::Conflict(_)) => {
            let username_taken = store
                .get_user_by_username(&username)
                .api_err("Failed to check username")?
                .is_some();
            if username_taken {
                Err(ApiError::bad_request("Username already exists"))
            } else {
                Err(ApiError::bad_request("Email already exists"))
            }
        }
        result => result.api_err("Failed to create user"),
    }
}

pub async fn list_users(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListUsersParams>,
) -> impl IntoResponse {
    let role = params
        .role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::Customer);

    let users = state
        .store
        .list_users_by_role(role)
        .api_err("Failed to list users")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    RequireStaff(actor): RequireStaff,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> impl IntoResponse {
    let role = req.role.unwrap_or_default();
    if actor.role == Role::Pharmacist && role != Role::Customer {
        return Err(ApiError::forbidden("Pharmacists can only create customer accounts"));
    }

    let user = create_account(&state, req, role)?;
    tracing::info!(username = %user.username, created_by = %actor.username, "Created account");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    RequireAuth(actor): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if !actor.role.is_staff() && actor.id != id {
        return Err(ApiError::forbidden("Not allowed to view this user"));
    }

    let user = state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    RequireAuth(actor): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> impl IntoResponse {
    if actor.id != id && actor.role != Role::Manager {
        return Err(ApiError::forbidden("Not allowed to update this user"));
    }

    let store = state.store.as_ref();
    let mut user = store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if let Some(email) = req.email {
        validate_email(&email)?;
        let taken = store
            .get_user_by_email(&email)
            .api_err("Failed to check email")?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(ApiError::conflict("Email already exists"));
        }
        user.email = email;
    }
    if let Some(full_name) = req.full_name {
        validate_required(&full_name, "full_name")?;
        user.full_name = full_name.trim().to_string();
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone);
    }
    if let Some(address) = req.address {
        user.address = Some(address);
    }

    store.update_user(&user).api_err("Failed to update user")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn set_user_status(
    RequireManager(actor): RequireManager,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UserStatusRequest>,
) -> impl IntoResponse {
    if actor.id == id && !req.is_active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    let store = state.store.as_ref();
    if !store
        .set_user_active(id, req.is_active)
        .api_err("Failed to update user status")?
    {
        return Err(ApiError::not_found("User not found"));
    }

    if !req.is_active {
        let ended = store
            .delete_user_sessions(id)
            .api_err("Failed to end user sessions")?;
        tracing::info!(user_id = id, sessions = ended, "Deactivated user");
    }

    let user = store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}
