use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{SessionValidationError, session_key_from_headers, validate_session};
use crate::server::AppState;
use crate::types::User;

/// Extractor that requires any signed-in user
pub struct RequireAuth(pub User);

/// Extractor that requires a pharmacist or manager
pub struct RequireStaff(pub User);

/// Extractor that requires a manager
pub struct RequireManager(pub User);

/// The signed-in user if the request carries a valid session, otherwise `None`.
pub struct MaybeAuth(pub Option<User>);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidSession,
    SessionExpired,
    Deactivated,
    NotStaff,
    NotManager,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidSession => (StatusCode::UNAUTHORIZED, "Invalid session"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::Deactivated => (StatusCode::UNAUTHORIZED, "Account is deactivated"),
            AuthError::NotStaff => (StatusCode::FORBIDDEN, "Staff access required"),
            AuthError::NotManager => (StatusCode::FORBIDDEN, "Manager access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"dispensary\""),
            );
        }

        response
    }
}

impl From<SessionValidationError> for AuthError {
    fn from(e: SessionValidationError) -> Self {
        match e {
            SessionValidationError::InvalidSession => AuthError::InvalidSession,
            SessionValidationError::SessionExpired => AuthError::SessionExpired,
            SessionValidationError::Deactivated => AuthError::Deactivated,
            SessionValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_session(parts, state)?;
        Ok(RequireAuth(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireStaff {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_session(parts, state)?;

        if !user.role.is_staff() {
            return Err(AuthError::NotStaff);
        }

        Ok(RequireStaff(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireManager {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_session(parts, state)?;

        if user.role != crate::types::Role::Manager {
            return Err(AuthError::NotManager);
        }

        Ok(RequireManager(user))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match extract_and_validate_session(parts, state) {
            Ok(user) => Ok(MaybeAuth(Some(user))),
            Err(AuthError::InternalError) => Err(AuthError::InternalError),
            Err(_) => Ok(MaybeAuth(None)),
        }
    }
}

fn extract_and_validate_session(parts: &Parts, state: &Arc<AppState>) -> Result<User, AuthError> {
    let raw_key = session_key_from_headers(&parts.headers).ok_or(AuthError::MissingAuth)?;
    Ok(validate_session(state, &raw_key)?)
}
