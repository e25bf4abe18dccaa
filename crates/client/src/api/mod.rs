//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - [`AuthBackend`] is the seam between the session/health logic and the
//!   network; [`ApiClient`] implements it over `reqwest`.
//! - Bearer tokens are held as [`SecretString`] and only exposed when the
//!   `Authorization` header is built.
//! - Responses are read as text first so non-success bodies can be logged and
//!   classified (see [`ApiError::is_auth_rejection`]).
//!
//! # Endpoints
//!
//! - `POST auth/login`, `POST auth/register` - return `{ token, user }`
//! - `GET auth/verify` - returns `{ valid, user }`
//! - `GET auth/profile` - returns the user (bare or wrapped in `{ user }`)
//! - `GET health` - liveness, short timeout

mod error;
#[cfg(test)]
pub(crate) mod fake;

pub use error::ApiError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use farm_connect_core::User;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::forms::{Credentials, Registration};

/// Timeout for every request other than health probes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body kept in [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 500;

/// Response from the login and register endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: SecretString,
    /// The authenticated user.
    pub user: User,
}

/// Backend operations the session store and health monitor depend on.
///
/// Implemented by [`ApiClient`]; tests substitute scripted backends.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchange credentials for a token.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Create an account and receive a token for it.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Check that a token is still valid.
    ///
    /// Returns the current user record when the backend includes one.
    fn verify(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Option<User>, ApiError>> + Send;

    /// Fetch the profile of the token's owner.
    fn profile(&self, token: &SecretString) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// Probe backend liveness.
    fn health(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// HTTP client for the marketplace REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    health_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default = "default_valid")]
    valid: bool,
    #[serde(default)]
    user: Option<User>,
}

const fn default_valid() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: User },
    Bare(User),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    /// Create a client for the configured API base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                health_timeout: config.health.timeout,
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    async fn send_auth(&self, path: &str, body: &impl Serialize) -> Result<AuthResponse, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }
}

impl AuthBackend for ApiClient {
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let body = LoginBody {
            email: credentials.email().as_str(),
            password: credentials.password(),
        };
        self.send_auth("auth/login", &body).await
    }

    #[instrument(skip(self, registration), fields(email = %registration.email(), role = %registration.role()))]
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let body = RegisterBody {
            name: registration.name(),
            email: registration.email().as_str(),
            password: registration.password(),
            role: registration.role().to_string(),
            phone: registration.phone(),
        };
        self.send_auth("auth/register", &body).await
    }

    #[instrument(skip_all)]
    async fn verify(&self, token: &SecretString) -> Result<Option<User>, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("auth/verify")?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let verified: VerifyResponse = read_json(response).await?;
        if !verified.valid {
            return Err(ApiError::Unauthorized("token is no longer valid".to_string()));
        }
        Ok(verified.user)
    }

    #[instrument(skip_all)]
    async fn profile(&self, token: &SecretString) -> Result<User, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("auth/profile")?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        match read_json::<ProfileResponse>(response).await? {
            ProfileResponse::Wrapped { user } | ProfileResponse::Bare(user) => Ok(user),
        }
    }

    async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("health")?)
            .timeout(self.inner.health_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            debug!(status = %status, "Health probe returned non-success status");
            Err(ApiError::Status {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            })
        }
    }
}

/// Read a response body and classify it.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    // Get response body as text first for better error diagnostics
    let body = response.text().await?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        return Err(ApiError::Unauthorized(message));
    }

    if !status.is_success() {
        let message = error_message(&body)
            .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect::<String>());
        warn!(status = %status, message = %message, "Backend returned non-success status");
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Pull `message` (or `error`) out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            error_message(r#"{"error":"jwt expired"}"#).as_deref(),
            Some("jwt expired")
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"message":""}"#), None);
    }

    #[test]
    fn test_verify_response_defaults_to_valid() {
        let parsed: VerifyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.valid);
        assert!(parsed.user.is_none());

        let parsed: VerifyResponse = serde_json::from_str(r#"{"valid":false}"#).unwrap();
        assert!(!parsed.valid);
    }

    #[test]
    fn test_profile_response_shapes() {
        let user = r#"{"_id":"u1","name":"Lu","email":"lu@farm.com","role":"buyer"}"#;
        let bare: ProfileResponse = serde_json::from_str(user).unwrap();
        let wrapped: ProfileResponse =
            serde_json::from_str(&format!(r#"{{"user":{user}}}"#)).unwrap();
        for parsed in [bare, wrapped] {
            match parsed {
                ProfileResponse::Wrapped { user } | ProfileResponse::Bare(user) => {
                    assert_eq!(user.id.as_str(), "u1");
                }
            }
        }
    }

    #[test]
    fn test_endpoints_resolve_under_base_path() {
        let config = ClientConfig::default()
            .with_api_url("http://127.0.0.1:9/api")
            .unwrap();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("auth/login").unwrap().as_str(),
            "http://127.0.0.1:9/api/auth/login"
        );
    }

    #[test]
    fn test_auth_response_debug_hides_token() {
        let parsed: AuthResponse = serde_json::from_str(
            r#"{"token":"eyJ.secret.sig","user":{"id":"u1","name":"Lu","email":"lu@farm.com","role":"buyer"}}"#,
        )
        .unwrap();
        assert!(!format!("{parsed:?}").contains("eyJ.secret.sig"));
    }
}
