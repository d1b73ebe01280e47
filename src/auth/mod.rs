mod credentials;
mod helpers;
mod middleware;

pub use credentials::{CredentialHasher, generate_password, parse_session_key};
pub use helpers::{
    SESSION_COOKIE, clear_session_cookie, end_session, session_cookie, session_key_from_headers,
    start_session,
};
pub use middleware::{AuthError, MaybeAuth, RequireAuth, RequireManager, RequireStaff};
