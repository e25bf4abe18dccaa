//! Crate-level error type.
//!
//! Each concern has its own error enum; [`ClientError`] wraps them so callers
//! (the CLI, embedding apps) can use `?` across the whole client.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::forms::ValidationError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Any error produced by the FarmConnect client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// Whether the error means the user has to sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Api(e) | Self::Session(SessionError::Api(e)) => e.is_auth_rejection(),
            Self::Session(SessionError::NotAuthenticated) => true,
            Self::Config(_) | Self::Storage(_) | Self::Cart(_) | Self::Validation(_) => false,
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
