//! In-process test harness: a router over a fresh database in a temp dir.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use dispensary::auth::CredentialHasher;
use dispensary::config::ServerConfig;
use dispensary::server::{AppState, create_router};
use dispensary::store::{SqliteStore, Store};
use dispensary::types::{NewUser, Role};

pub const MANAGER: (&str, &str) = ("boss", "manager-pass");

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");

        let hasher = CredentialHasher::new();
        store
            .create_user(&NewUser {
                username: MANAGER.0.to_string(),
                password_hash: hasher.hash(MANAGER.1).expect("hash"),
                email: "boss@dispensary.local".to_string(),
                full_name: "Store Manager".to_string(),
                phone: None,
                address: None,
                role: Role::Manager,
            })
            .expect("create manager");

        let state = Arc::new(AppState::new(Arc::new(store), config));
        let router = create_router(state.clone());

        Self {
            temp_dir,
            state,
            router,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("build request")).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    pub async fn request_with_bearer(&self, uri: &str, key: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(cookie), Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(cookie), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(cookie), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(cookie), None).await
    }

    /// Logs in and returns the `name=value` pair to send back as a Cookie header.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {:?}", resp.body);

        let set_cookie = resp.set_cookie.expect("login sets a cookie");
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string()
    }

    pub async fn login_manager(&self) -> String {
        self.login(MANAGER.0, MANAGER.1).await
    }

    /// Creates an account through the API as the manager.
    pub async fn create_account(&self, manager: &str, username: &str, role: &str) -> i64 {
        let resp = self
            .post(
                "/api/users",
                manager,
                serde_json::json!({
                    "username": username,
                    "password": "secret123",
                    "email": format!("{username}@example.com"),
                    "full_name": format!("{username} Person"),
                    "role": role,
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        resp.data()["id"].as_i64().expect("user id")
    }

    pub async fn create_medicine(
        &self,
        staff: &str,
        sku: &str,
        price: &str,
        requires_prescription: bool,
    ) -> i64 {
        let resp = self
            .post(
                "/api/medicines",
                staff,
                serde_json::json!({
                    "name": format!("Medicine {sku}"),
                    "sku": sku,
                    "price": price,
                    "requires_prescription": requires_prescription,
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        resp.data()["id"].as_i64().expect("medicine id")
    }

    pub async fn create_batch(
        &self,
        staff: &str,
        medicine_id: i64,
        batch_number: &str,
        quantity: i64,
        expiry: &str,
    ) -> i64 {
        let resp = self
            .post(
                "/api/inventory",
                staff,
                serde_json::json!({
                    "medicine_id": medicine_id,
                    "batch_number": batch_number,
                    "quantity": quantity,
                    "min_stock_level": 5,
                    "expiry_date": expiry,
                    "cost_price": "1.00",
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        resp.data()["id"].as_i64().expect("batch id")
    }

    pub async fn batch_quantity(&self, staff: &str, batch_id: i64) -> i64 {
        let resp = self.get(&format!("/api/inventory/{batch_id}"), staff).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.data()["quantity"].as_i64().expect("quantity")
    }
}

/// An expiry date comfortably in the future, as `YYYY-MM-DD`.
pub fn far_expiry(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}
