//! Integration tests for FarmConnect.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p farm-connect-integration-tests
//! ```
//!
//! # Mock Backend
//!
//! [`MockBackend`] serves the marketplace auth and health endpoints with
//! `axum` on an ephemeral local port. Verify and health responses are
//! scripted per test (a queue of status codes, then a default), and every
//! endpoint counts its calls so retry behaviour can be asserted exactly.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use farm_connect_client::{ClientConfig, ConfigError};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Password the mock always rejects.
pub const WRONG_PASSWORD: &str = "wrong-password";

/// Status code script for one endpoint.
#[derive(Debug)]
struct Script {
    queue: Mutex<VecDeque<StatusCode>>,
    default: Mutex<StatusCode>,
    calls: AtomicU32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: Mutex::new(StatusCode::OK),
            calls: AtomicU32::new(0),
        }
    }
}

impl Script {
    fn next(&self) -> StatusCode {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        queued.unwrap_or_else(|| *self.default.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, codes: &[StatusCode]) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(codes);
    }

    fn set_default(&self, code: StatusCode) {
        *self.default.lock().unwrap_or_else(PoisonError::into_inner) = code;
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct MockState {
    login: Script,
    verify: Script,
    profile: Script,
    health: Script,
    issued: AtomicU32,
}

/// Marketplace backend double served over HTTP.
#[derive(Debug)]
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/verify", get(verify))
            .route("/api/auth/profile", get(profile))
            .route("/api/health", get(health))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// API base URL, e.g. `http://127.0.0.1:54321/api`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this backend with millisecond timings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is rejected.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::default().with_api_url(&self.api_url())?;
        config.verification.attempts = 3;
        config.verification.base_delay = Duration::from_millis(5);
        config.health.interval = Duration::from_millis(20);
        config.health.timeout = Duration::from_millis(500);
        config.health.failure_threshold = 2;
        config.health.recovery_attempts = 3;
        config.health.recovery_interval = Duration::from_millis(20);
        Ok(config)
    }

    /// Queue status codes for upcoming `/auth/verify` calls.
    pub fn queue_verify(&self, codes: &[StatusCode]) {
        self.state.verify.push(codes);
    }

    /// Status for `/auth/verify` once the queue is empty.
    pub fn set_verify_default(&self, code: StatusCode) {
        self.state.verify.set_default(code);
    }

    /// Queue status codes for upcoming `/health` calls.
    pub fn queue_health(&self, codes: &[StatusCode]) {
        self.state.health.push(codes);
    }

    /// Status for `/health` once the queue is empty.
    pub fn set_health_default(&self, code: StatusCode) {
        self.state.health.set_default(code);
    }

    /// Status for `/auth/profile`.
    pub fn set_profile_default(&self, code: StatusCode) {
        self.state.profile.set_default(code);
    }

    #[must_use]
    pub fn login_calls(&self) -> u32 {
        self.state.login.calls()
    }

    #[must_use]
    pub fn verify_calls(&self) -> u32 {
        self.state.verify.calls()
    }

    #[must_use]
    pub fn health_calls(&self) -> u32 {
        self.state.health.calls()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    role: String,
}

fn user_json(email: &str, name: &str, role: &str) -> serde_json::Value {
    json!({
        "_id": format!("user-{email}"),
        "name": name,
        "email": email,
        "role": role,
        "createdAt": "2026-01-01T00:00:00Z"
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len())
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<LoginBody>) -> Response {
    let status = state.login.next();
    if body.password == WRONG_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    if status != StatusCode::OK {
        return error(status, "login unavailable");
    }
    let n = state.issued.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "token": format!("token-{n}"),
        "user": user_json(&body.email, "Test Buyer", "buyer"),
    }))
    .into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<RegisterBody>) -> Response {
    let n = state.issued.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(json!({
            "token": format!("token-{n}"),
            "user": user_json(&body.email, &body.name, &body.role),
        })),
    )
        .into_response()
}

async fn verify(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let status = state.verify.next();
    if !has_bearer(&headers) {
        return error(StatusCode::UNAUTHORIZED, "No token provided");
    }
    match status {
        StatusCode::OK => Json(json!({ "valid": true })).into_response(),
        StatusCode::UNAUTHORIZED => error(status, "Token expired"),
        other => error(other, "verification unavailable"),
    }
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let status = state.profile.next();
    if !has_bearer(&headers) {
        return error(StatusCode::UNAUTHORIZED, "No token provided");
    }
    if status != StatusCode::OK {
        return error(status, "profile unavailable");
    }
    Json(json!({ "user": user_json("buyer@farm.com", "Profile Name", "buyer") })).into_response()
}

async fn health(State(state): State<Arc<MockState>>) -> Response {
    let status = state.health.next();
    if status == StatusCode::OK {
        Json(json!({ "status": "ok" })).into_response()
    } else {
        error(status, "down")
    }
}
