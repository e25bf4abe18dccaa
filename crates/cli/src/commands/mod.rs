//! Command implementations.

pub mod auth;
pub mod cart;
pub mod watch;

use std::sync::Arc;

use farm_connect_client::{ClientConfig, ClientError, FarmConnect, FileStorage, StorageError};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Invalid price {0:?}: expected a decimal amount like 4.50")]
    InvalidPrice(String),

    #[error("Not signed in. Run `fc-cli login` first.")]
    NotSignedIn,

    #[error("Failed to listen for Ctrl-C: {0}")]
    Signal(#[from] std::io::Error),
}

impl CommandError {
    /// Whether the backend ended the session, so the user must sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Client(e) => e.requires_login(),
            Self::InvalidPrice(_) | Self::NotSignedIn | Self::Signal(_) => false,
        }
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        Self::Client(e.into())
    }
}

/// Open the file-backed app container under the configured data directory.
pub fn open(config: ClientConfig) -> Result<FarmConnect, CommandError> {
    let storage = FileStorage::open(&config.data_dir)?;
    tracing::debug!(dir = %storage.dir().display(), "Using file storage");
    Ok(FarmConnect::connect(config, Arc::new(storage))?)
}

#[cfg(test)]
mod tests {
    use farm_connect_client::{ApiError, CartError, SessionError};

    use super::*;

    #[test]
    fn test_requires_login_follows_client_error() {
        let rejected = CommandError::Client(ClientError::from(SessionError::Api(
            ApiError::Unauthorized("jwt expired".to_string()),
        )));
        assert!(rejected.requires_login());

        let cart = CommandError::Client(ClientError::from(CartError::ZeroQuantity));
        assert!(!cart.requires_login());
        assert!(!CommandError::NotSignedIn.requires_login());
    }
}
