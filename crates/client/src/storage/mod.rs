//! Durable client-side key/value storage.
//!
//! The web client kept session, cart and wishlist state in `localStorage`;
//! [`Storage`] is the same contract (string values by key, synchronous) with
//! an in-memory and a file-backed implementation.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys for persisted client state.
pub mod keys {
    /// Bearer token (raw string).
    pub const TOKEN: &str = "token";

    /// Session user (JSON).
    pub const USER: &str = "user";

    /// When the token was issued (epoch milliseconds).
    pub const TOKEN_TIMESTAMP: &str = "tokenTimestamp";

    /// Remember-me preference (`true`/`false`).
    pub const REMEMBER_ME: &str = "rememberMe";

    /// Cart items (JSON array).
    pub const CART: &str = "cart";

    /// Wishlist items (JSON array).
    pub const WISHLIST: &str = "wishlist";

    /// Every key owned by the session.
    pub const SESSION: [&str; 4] = [TOKEN, USER, TOKEN_TIMESTAMP, REMEMBER_ME];
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be parsed.
    #[error("corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A value could not be serialized.
    #[error("failed to serialize value for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key cannot be used by this backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub(crate) fn corrupt(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Synchronous string key/value storage.
pub trait Storage: Send + Sync {
    /// Read a value, `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and parse a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if the stored text is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    storage
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(|e| StorageError::corrupt(key, e)))
        .transpose()
}

/// Serialize and write a JSON value.
///
/// # Errors
///
/// Returns `StorageError` if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_helpers() {
        let storage = MemoryStorage::new();
        write_json(&storage, keys::CART, &vec![1, 2, 3]).unwrap();
        let read: Option<Vec<u32>> = read_json(&storage, keys::CART).unwrap();
        assert_eq!(read, Some(vec![1, 2, 3]));

        let missing: Option<Vec<u32>> = read_json(&storage, keys::WISHLIST).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_corrupt_json_is_reported() {
        let storage = MemoryStorage::new();
        storage.set(keys::CART, "[{not json").unwrap();
        let err = read_json::<Vec<u32>>(&storage, keys::CART).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == "cart"));
    }
}
