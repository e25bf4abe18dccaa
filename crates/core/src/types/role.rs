//! Marketplace user roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not one of the marketplace roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid user role: {0} (expected buyer, farmer or driver)")]
pub struct RoleError(pub String);

/// Role of a marketplace account.
///
/// Every session user carries exactly one of these; unknown values coming
/// from storage or the backend fail to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shops the catalog and owns a cart and wishlist.
    #[default]
    Buyer,
    /// Lists produce for sale.
    Farmer,
    /// Delivers orders.
    Driver,
}

impl UserRole {
    /// Whether this role shops (and therefore has a cart and wishlist).
    #[must_use]
    pub const fn can_shop(self) -> bool {
        matches!(self, Self::Buyer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Farmer => write!(f, "farmer"),
            Self::Driver => write!(f, "driver"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "farmer" => Ok(Self::Farmer),
            "driver" => Ok(Self::Driver),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}
