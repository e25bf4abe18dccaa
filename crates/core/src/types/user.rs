//! Marketplace account identity.

use serde::{Deserialize, Serialize};

use crate::{Email, UserId, UserRole};

/// The identity stored alongside a session token.
///
/// Mirrors the `user` object returned by the login, register, verify and
/// profile endpoints and persisted under the `user` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: Email,
    /// Marketplace role.
    pub role: UserRole,
}
