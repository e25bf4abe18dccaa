//! Buyer's wishlist store.

use std::sync::Arc;

use farm_connect_core::{ProductId, WishlistItem};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::events::{AppEvent, EventBus};
use crate::storage::{self, Storage, StorageError, keys};

/// Shared handle to the wishlist. Membership is by product id.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    storage: Arc<dyn Storage>,
    events: EventBus,
    items: Mutex<Vec<WishlistItem>>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    /// Load the persisted wishlist; unreadable data becomes an empty list.
    pub fn load(storage: Arc<dyn Storage>, events: EventBus) -> Self {
        let mut items =
            match storage::read_json::<Vec<WishlistItem>>(storage.as_ref(), keys::WISHLIST) {
                Ok(items) => items.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Stored wishlist is unreadable, starting empty");
                    Vec::new()
                }
            };
        let mut seen = std::collections::HashSet::new();
        items.retain(|item| seen.insert(item.product_id.clone()));

        Self {
            inner: Arc::new(WishlistInner {
                storage,
                events,
                items: Mutex::new(items),
            }),
        }
    }

    /// Add `item` if absent, remove it if present.
    ///
    /// Returns whether the product is on the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the wishlist cannot be persisted.
    pub fn toggle_wishlist(&self, item: WishlistItem) -> Result<bool, StorageError> {
        self.mutate(|items| {
            if let Some(pos) = items.iter().position(|i| i.product_id == item.product_id) {
                items.remove(pos);
                false
            } else {
                items.push(item);
                true
            }
        })
    }

    /// Remove a product. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the wishlist cannot be persisted.
    pub fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<(), StorageError> {
        self.mutate(|items| items.retain(|i| &i.product_id != product_id))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the wishlist cannot be persisted.
    pub fn clear_wishlist(&self) -> Result<(), StorageError> {
        self.mutate(Vec::clear)
    }

    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
        self.inner.items.lock().clone()
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.inner
            .items
            .lock()
            .iter()
            .any(|i| &i.product_id == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<WishlistItem>) -> T) -> Result<T, StorageError> {
        let (result, snapshot) = {
            let mut items = self.inner.items.lock();
            let mut next = items.clone();
            let result = f(&mut next);
            storage::write_json(self.inner.storage.as_ref(), keys::WISHLIST, &next)?;
            *items = next;
            (result, items.clone())
        };

        debug!(len = snapshot.len(), "Wishlist updated");
        self.inner.events.publish(AppEvent::WishlistUpdated(snapshot));
        Ok(result)
    }
}
