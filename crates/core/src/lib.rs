//! FarmConnect Core - Shared domain types.
//!
//! This crate provides the types shared by every FarmConnect client component:
//! - `client` - Session, cart, wishlist and health-monitoring library
//! - `cli` - Command-line driver for the client library
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, prices, roles, and catalog/notification records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
