//! FarmConnect client library.
//!
//! Client-side core shared by the FarmConnect buyer, farmer and driver apps:
//! the session lifecycle (optimistic restore, retry-with-backoff token
//! verification, token-age policy, idempotent logout), the buyer's cart and
//! wishlist with change notifications, backend health monitoring, and the
//! notification inbox.
//!
//! Everything hangs off an explicitly constructed [`FarmConnect`] container;
//! there is no global state.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use farm_connect_client::{ClientConfig, FarmConnect, storage::FileStorage};
//!
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(FileStorage::open(&config.data_dir)?);
//! let app = FarmConnect::connect(config, storage)?;
//!
//! app.session().initialize().await;
//! let maintenance = app.start();
//! // ...
//! maintenance.shutdown().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod app;
pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod forms;
pub mod health;
pub mod notifications;
pub mod session;
pub mod storage;
pub mod wishlist;

pub use api::{ApiClient, ApiError, AuthBackend, AuthResponse};
pub use app::{FarmConnect, Maintenance};
pub use cart::{CartError, CartStore};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use events::{AppEvent, EventBus, Notice, NoticeLevel};
pub use forms::{Credentials, Registration, ValidationError};
pub use health::{BackendStatus, HealthMonitor};
pub use notifications::NotificationInbox;
pub use session::{LogoutReason, Session, SessionError, SessionState, SessionStatus, SessionStore};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use wishlist::WishlistStore;
