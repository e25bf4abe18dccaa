//! Scripted in-process backend for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use farm_connect_core::{Email, User, UserRole};
use parking_lot::Mutex;
use secrecy::SecretString;

use super::{ApiError, AuthBackend, AuthResponse};
use crate::forms::{Credentials, Registration};

/// How the fake answers one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Unauthorized,
    Unavailable,
    BadRequest,
}

impl Reply {
    fn into_result(self) -> Result<(), ApiError> {
        match self {
            Self::Ok => Ok(()),
            Self::Unauthorized => Err(ApiError::Unauthorized("invalid token".to_string())),
            Self::Unavailable => Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Self::BadRequest => Err(ApiError::Status {
                status: 400,
                message: "malformed request".to_string(),
            }),
        }
    }
}

/// Queued replies are consumed first; the default answers once the queue is empty.
#[derive(Debug)]
struct Script {
    queue: Mutex<VecDeque<Reply>>,
    default: Mutex<Reply>,
    calls: AtomicU32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: Mutex::new(Reply::Ok),
            calls: AtomicU32::new(0),
        }
    }
}

impl Script {
    fn next(&self) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| *self.default.lock())
    }
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    verify: Script,
    health: Script,
    login: Script,
    profile: Script,
}

pub fn user(email: &str) -> User {
    User {
        id: format!("id-{email}").into(),
        name: "Test Buyer".to_string(),
        email: Email::parse(email).unwrap_or_else(|e| panic!("bad test email {email}: {e}")),
        role: UserRole::Buyer,
    }
}

impl FakeBackend {
    pub fn queue_verify(&self, replies: &[Reply]) {
        self.verify.queue.lock().extend(replies);
    }

    pub fn set_verify_default(&self, reply: Reply) {
        *self.verify.default.lock() = reply;
    }

    pub fn queue_health(&self, replies: &[Reply]) {
        self.health.queue.lock().extend(replies);
    }

    pub fn set_health_default(&self, reply: Reply) {
        *self.health.default.lock() = reply;
    }

    pub fn set_login_default(&self, reply: Reply) {
        *self.login.default.lock() = reply;
    }

    pub fn set_profile_default(&self, reply: Reply) {
        *self.profile.default.lock() = reply;
    }

    pub fn verify_calls(&self) -> u32 {
        self.verify.calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> u32 {
        self.health.calls.load(Ordering::SeqCst)
    }
}

impl AuthBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.login.next().into_result()?;
        Ok(AuthResponse {
            token: SecretString::from(format!("token-{}", credentials.email())),
            user: user(credentials.email().as_str()),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.login.next().into_result()?;
        let mut user = user(registration.email().as_str());
        registration.name().clone_into(&mut user.name);
        user.role = registration.role();
        Ok(AuthResponse {
            token: SecretString::from(format!("token-{}", registration.email())),
            user,
        })
    }

    async fn verify(&self, _token: &SecretString) -> Result<Option<User>, ApiError> {
        self.verify.next().into_result()?;
        Ok(None)
    }

    async fn profile(&self, _token: &SecretString) -> Result<User, ApiError> {
        self.profile.next().into_result()?;
        let mut user = user("buyer@farm.com");
        user.name = "Refreshed Buyer".to_string();
        Ok(user)
    }

    async fn health(&self) -> Result<(), ApiError> {
        self.health.next().into_result()
    }
}
