//! Reading and writing the session keys.

use chrono::{DateTime, TimeZone, Utc};
use farm_connect_core::User;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::Session;
use crate::storage::{self, Storage, StorageError, keys};

/// Load the persisted session.
///
/// Returns `Ok(None)` when no token is stored. A token without a readable
/// user or timestamp is an incomplete record and reported as corrupt.
pub(crate) fn load(store: &dyn Storage) -> Result<Option<Session>, StorageError> {
    let Some(token) = store.get(keys::TOKEN)?.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };

    let user: User = storage::read_json(store, keys::USER)?
        .ok_or_else(|| StorageError::corrupt(keys::USER, "missing while a token is stored"))?;

    let raw_timestamp = store
        .get(keys::TOKEN_TIMESTAMP)?
        .ok_or_else(|| StorageError::corrupt(keys::TOKEN_TIMESTAMP, "missing"))?;
    let issued_at = parse_timestamp(&raw_timestamp)
        .ok_or_else(|| StorageError::corrupt(keys::TOKEN_TIMESTAMP, raw_timestamp.trim()))?;

    let remember_me = store
        .get(keys::REMEMBER_ME)?
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    Ok(Some(Session {
        token: SecretString::from(token.trim()),
        user,
        issued_at,
        remember_me,
    }))
}

/// Persist every session key.
pub(crate) fn save(store: &dyn Storage, session: &Session) -> Result<(), StorageError> {
    store.set(keys::TOKEN, session.token.expose_secret())?;
    save_user(store, &session.user)?;
    store.set(
        keys::TOKEN_TIMESTAMP,
        &session.issued_at.timestamp_millis().to_string(),
    )?;
    store.set(keys::REMEMBER_ME, if session.remember_me { "true" } else { "false" })
}

/// Persist only the user record (after a profile refresh).
pub(crate) fn save_user(store: &dyn Storage, user: &User) -> Result<(), StorageError> {
    storage::write_json(store, keys::USER, user)
}

/// Remove every session key.
///
/// Keeps going after a failed removal so as many keys as possible are gone;
/// the first error is returned.
pub(crate) fn clear(store: &dyn Storage) -> Result<(), StorageError> {
    let mut first_error = None;
    for key in keys::SESSION {
        if let Err(e) = store.remove(key) {
            warn!(key, error = %e, "Failed to remove session key");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Accept epoch milliseconds (what the web client wrote) or RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farm_connect_core::{Email, UserRole};

    use super::*;
    use crate::storage::MemoryStorage;

    fn session() -> Session {
        Session {
            token: SecretString::from("tok-abc"),
            user: User {
                id: "u1".into(),
                name: "Ivo".to_string(),
                email: Email::parse("ivo@farm.com").unwrap(),
                role: UserRole::Driver,
            },
            issued_at: Utc.timestamp_millis_opt(1_760_000_000_000).unwrap(),
            remember_me: true,
        }
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStorage::new();
        save(&store, &session()).unwrap();

        assert_eq!(store.get(keys::TOKEN_TIMESTAMP).unwrap().as_deref(), Some("1760000000000"));

        let loaded = load(&store).unwrap().unwrap();
        assert_eq!(loaded.token.expose_secret(), "tok-abc");
        assert_eq!(loaded.user.role, UserRole::Driver);
        assert_eq!(loaded.issued_at, session().issued_at);
        assert!(loaded.remember_me);
    }

    #[test]
    fn test_load_without_token_is_none() {
        let store = MemoryStorage::new();
        store.set(keys::USER, "{}").unwrap();
        assert!(load(&store).unwrap().is_none());
    }

    #[test]
    fn test_load_with_corrupt_user() {
        let store = MemoryStorage::new();
        save(&store, &session()).unwrap();
        store.set(keys::USER, "{\"name\":").unwrap();
        assert!(matches!(load(&store), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_load_accepts_rfc3339_timestamp() {
        let store = MemoryStorage::new();
        save(&store, &session()).unwrap();
        store
            .set(keys::TOKEN_TIMESTAMP, "2026-01-02T03:04:05Z")
            .unwrap();
        let loaded = load(&store).unwrap().unwrap();
        assert_eq!(loaded.issued_at.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_clear_removes_every_session_key() {
        let store = MemoryStorage::new();
        save(&store, &session()).unwrap();
        store.set(keys::CART, "[]").unwrap();

        clear(&store).unwrap();
        for key in keys::SESSION {
            assert!(!store.contains_key(key), "{key} should be gone");
        }
        assert!(store.contains_key(keys::CART));
    }
}
