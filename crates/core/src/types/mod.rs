//! Core types for FarmConnect.
//!
//! This module provides type-safe wrappers for common marketplace concepts.

pub mod catalog;
pub mod email;
pub mod id;
pub mod notification;
pub mod price;
pub mod role;
pub mod user;

pub use catalog::{CartItem, ProductSummary, WishlistItem};
pub use email::{Email, EmailError};
pub use id::*;
pub use notification::{Notification, NotificationKind};
pub use price::Price;
pub use role::{RoleError, UserRole};
pub use user::User;
