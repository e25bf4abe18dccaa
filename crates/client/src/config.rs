//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target a local development backend.
//!
//! - `FARMCONNECT_API_URL` - REST API base URL (default: `http://localhost:5000/api`)
//! - `FARMCONNECT_VERIFY_ATTEMPTS` - Token verification attempts (default: 3)
//! - `FARMCONNECT_VERIFY_BASE_DELAY_MS` - Backoff base delay (default: 1000)
//! - `FARMCONNECT_STRICT_VERIFICATION` - Log out when verification never succeeds (default: false)
//! - `FARMCONNECT_HEALTH_INTERVAL_SECS` - Health poll interval (default: 30)
//! - `FARMCONNECT_HEALTH_TIMEOUT_SECS` - Per-probe timeout (default: 5)
//! - `FARMCONNECT_HEALTH_FAILURE_THRESHOLD` - Failed probes before the outage notice (default: 2)
//! - `FARMCONNECT_RECOVERY_ATTEMPTS` - Passive recovery pings (default: 5)
//! - `FARMCONNECT_RECOVERY_INTERVAL_SECS` - Spacing of recovery pings (default: 10)
//! - `FARMCONNECT_TOKEN_CHECK_INTERVAL_SECS` - Token-age check interval (default: 300)
//! - `FARMCONNECT_SESSION_MAX_AGE_HOURS` - Lifetime of non-remember-me sessions (default: 24)
//! - `FARMCONNECT_REFRESH_AFTER_MINUTES` - Revalidate tokens older than this (default: 60)
//! - `FARMCONNECT_DATA_DIR` - Directory for file-backed storage (default: `.farmconnect`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_DATA_DIR: &str = ".farmconnect";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid API URL {0}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base URL (always ends with `/`)
    pub api_url: Url,
    /// Token verification retry settings
    pub verification: VerificationConfig,
    /// Health monitor settings
    pub health: HealthConfig,
    /// Token-age policy settings
    pub token_policy: TokenPolicyConfig,
    /// Directory for file-backed storage
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Token verification retry settings.
#[derive(Debug, Clone, Copy)]
pub struct VerificationConfig {
    /// Maximum verification attempts (at least 1)
    pub attempts: u32,
    /// Delay before retry `n` is `base_delay * n`
    pub base_delay: Duration,
    /// End the session when every attempt failed for network reasons
    pub strict: bool,
}

/// Health monitor settings.
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    /// Time between liveness probes
    pub interval: Duration,
    /// Per-probe request timeout
    pub timeout: Duration,
    /// Consecutive failed probes before the outage notice
    pub failure_threshold: u32,
    /// Recovery pings after the outage notice
    pub recovery_attempts: u32,
    /// Time between recovery pings
    pub recovery_interval: Duration,
}

/// Token-age policy settings.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicyConfig {
    /// Time between token-age checks
    pub check_interval: Duration,
    /// Lifetime of sessions without remember-me
    pub session_max_age: Duration,
    /// Revalidate tokens not verified for this long
    pub refresh_after: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
            strict: false,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            failure_threshold: 2,
            recovery_attempts: 5,
            recovery_interval: Duration::from_secs(10),
        }
    }
}

impl Default for TokenPolicyConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5 * 60),
            session_max_age: Duration::from_secs(24 * 60 * 60),
            refresh_after: Duration::from_secs(60 * 60),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            verification: VerificationConfig::default(),
            health: HealthConfig::default(),
            token_policy: TokenPolicyConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("FARMCONNECT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let verification = VerificationConfig {
            attempts: parse_var(&lookup, "FARMCONNECT_VERIFY_ATTEMPTS", 3)?,
            base_delay: Duration::from_millis(parse_var(
                &lookup,
                "FARMCONNECT_VERIFY_BASE_DELAY_MS",
                1000,
            )?),
            strict: parse_var(&lookup, "FARMCONNECT_STRICT_VERIFICATION", false)?,
        };

        let health = HealthConfig {
            interval: secs(parse_var(&lookup, "FARMCONNECT_HEALTH_INTERVAL_SECS", 30)?),
            timeout: secs(parse_var(&lookup, "FARMCONNECT_HEALTH_TIMEOUT_SECS", 5)?),
            failure_threshold: parse_var(&lookup, "FARMCONNECT_HEALTH_FAILURE_THRESHOLD", 2)?,
            recovery_attempts: parse_var(&lookup, "FARMCONNECT_RECOVERY_ATTEMPTS", 5)?,
            recovery_interval: secs(parse_var(&lookup, "FARMCONNECT_RECOVERY_INTERVAL_SECS", 10)?),
        };

        let token_policy = TokenPolicyConfig {
            check_interval: secs(parse_var(
                &lookup,
                "FARMCONNECT_TOKEN_CHECK_INTERVAL_SECS",
                300,
            )?),
            session_max_age: secs(
                parse_var::<u64>(&lookup, "FARMCONNECT_SESSION_MAX_AGE_HOURS", 24)? * 60 * 60,
            ),
            refresh_after: secs(
                parse_var::<u64>(&lookup, "FARMCONNECT_REFRESH_AFTER_MINUTES", 60)? * 60,
            ),
        };

        let config = Self {
            api_url: parse_api_url(&api_url)?,
            verification,
            health,
            token_policy,
            data_dir: lookup("FARMCONNECT_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the API base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `url` does not parse.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(url)?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.verification.attempts == 0 {
            return Err(ConfigError::Invalid(
                "FARMCONNECT_VERIFY_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.health.interval.is_zero() || self.token_policy.check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "polling intervals must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

const fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is a valid absolute URL")
}

/// Parse a base URL and make sure relative joins append to its path.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse an optional variable, falling back to `default` when unset or empty.
fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        _ => Ok(default),
    }
}
