//! # Dispensary
//!
//! A pharmacy management backend over SQLite: medicines, stock batches,
//! prescriptions, sales and discounts behind a JSON API with cookie sessions.
//! Usable as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! dispensary = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dispensary::config::ServerConfig;
//! use dispensary::server::{AppState, create_router};
//! use dispensary::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::load("./data").unwrap();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `dispensary` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod pricing;
pub mod seed;
pub mod server;
pub mod store;
pub mod types;
