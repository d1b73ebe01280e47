use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use chrono::Utc;

use super::parse_session_key;
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::types::{Session, User};

pub const SESSION_COOKIE: &str = "dispensary_session";

const MAX_SESSION_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum SessionValidationError {
    InvalidSession,
    SessionExpired,
    Deactivated,
    InternalError,
}

/// Finds the session key in the session cookie, falling back to a Bearer header.
pub fn session_key_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|key| key.trim().to_string())
    })
}

/// Finds the session behind `raw_key`, checking the secret half against the
/// stored hash. A key whose lookup matches but whose secret does not is
/// treated as unknown.
fn find_session(
    state: &Arc<AppState>,
    raw_key: &str,
) -> std::result::Result<Session, SessionValidationError> {
    let (lookup, _secret) =
        parse_session_key(raw_key).map_err(|_| SessionValidationError::InvalidSession)?;

    let session = state
        .store
        .get_session_by_lookup(&lookup)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidSession)?;

    if !state
        .hasher
        .verify(raw_key, &session.key_hash)
        .map_err(|_| SessionValidationError::InternalError)?
    {
        return Err(SessionValidationError::InvalidSession);
    }

    Ok(session)
}

/// Validates a raw session key and returns the signed-in user.
/// Expired sessions are deleted on sight.
pub fn validate_session(
    state: &Arc<AppState>,
    raw_key: &str,
) -> std::result::Result<User, SessionValidationError> {
    let session = find_session(state, raw_key)?;

    if session.expires_at <= Utc::now() {
        if let Err(e) = state.store.delete_session(&session.id) {
            tracing::warn!("Failed to delete expired session: {e}");
        }
        return Err(SessionValidationError::SessionExpired);
    }

    let user = state
        .store
        .get_user(session.user_id)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidSession)?;

    if !user.is_active {
        return Err(SessionValidationError::Deactivated);
    }

    if let Err(e) = state.store.touch_session(&session.id) {
        tracing::warn!("Failed to update session last_seen_at: {e}");
    }

    Ok(user)
}

/// Creates a session for `user` and returns the raw key for the cookie.
pub fn start_session(state: &Arc<AppState>, user: &User) -> Result<String> {
    let now = Utc::now();

    for _ in 0..MAX_SESSION_ATTEMPTS {
        let (raw_key, lookup, hash) = state.hasher.generate_session_key()?;
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id,
            key_lookup: lookup,
            key_hash: hash,
            created_at: now,
            expires_at: now + state.config.session_ttl(),
            last_seen_at: None,
        };

        match state.store.create_session(&session) {
            Ok(()) => return Ok(raw_key),
            Err(Error::SessionLookupCollision) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::SessionLookupCollision)
}

/// Deletes the session behind `raw_key`. Unknown or forged keys are a no-op.
pub fn end_session(state: &Arc<AppState>, raw_key: &str) -> Result<()> {
    match find_session(state, raw_key) {
        Ok(session) => state.store.delete_session(&session.id).map(|_| ()),
        Err(SessionValidationError::InternalError) => {
            Err(Error::Hash("failed to verify session key".to_string()))
        }
        Err(_) => Ok(()),
    }
}

#[must_use]
pub fn session_cookie(raw_key: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={raw_key}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[must_use]
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_session_key_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; dispensary_session=dsp_abc; other=1"),
        );
        assert_eq!(session_key_from_headers(&headers).as_deref(), Some("dsp_abc"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("dispensary_session=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_key_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_session_key_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer dsp_xyz"));
        assert_eq!(session_key_from_headers(&headers).as_deref(), Some("dsp_xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(session_key_from_headers(&headers), None);
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("dispensary_session="));
        assert_eq!(session_key_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("dsp_k", 3600, false);
        assert_eq!(
            cookie,
            "dispensary_session=dsp_k; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600"
        );
        assert!(session_cookie("dsp_k", 3600, true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
