//! Buyer's cart store.
//!
//! Items are merged by product id. Every mutation persists the whole cart
//! under the `cart` key and then publishes [`AppEvent::CartUpdated`] with the
//! new contents. Queries are pure reads of the in-memory copy.
//!
//! The cart total always fits in a decimal: a mutation whose line or cart
//! total would overflow is rejected and leaves the cart unchanged.

use std::sync::Arc;

use farm_connect_core::{CartItem, Price, ProductId, ProductSummary};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::events::{AppEvent, EventBus};
use crate::storage::{self, Storage, StorageError, keys};

/// Cart operation errors.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("quantity is too large")]
    QuantityOverflow,

    #[error("cart total is too large")]
    TotalOverflow,

    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Shared handle to the cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    storage: Arc<dyn Storage>,
    events: EventBus,
    state: Mutex<CartState>,
}

struct CartState {
    items: Vec<CartItem>,
    total: Price,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.inner.state.lock().items)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Load the persisted cart. Unreadable data is logged and replaced by an
    /// empty cart.
    pub fn load(storage: Arc<dyn Storage>, events: EventBus) -> Self {
        let items = match storage::read_json::<Vec<CartItem>>(storage.as_ref(), keys::CART) {
            Ok(items) => sanitize(items.unwrap_or_default()),
            Err(e) => {
                warn!(error = %e, "Stored cart is unreadable, starting empty");
                Vec::new()
            }
        };
        let state = match cart_total(&items) {
            Some(total) => CartState { items, total },
            None => {
                warn!("Stored cart total overflows, starting empty");
                CartState {
                    items: Vec::new(),
                    total: Price::ZERO,
                }
            }
        };
        debug!(lines = state.items.len(), "Cart loaded");

        Self {
            inner: Arc::new(CartInner {
                storage,
                events,
                state: Mutex::new(state),
            }),
        }
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    ///
    /// Returns the resulting line.
    ///
    /// # Errors
    ///
    /// `ZeroQuantity` for a zero quantity, `QuantityOverflow` if the merged
    /// quantity does not fit, `TotalOverflow` if the priced line or the cart
    /// total does not fit, `Storage` if the cart cannot be persisted. The
    /// in-memory cart is left unchanged on every error.
    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    pub fn add_to_cart(&self, product: &ProductSummary, quantity: u32) -> Result<CartItem, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        self.mutate(|items| {
            let line = match items
                .iter_mut()
                .find(|item| item.product_id == product.product_id)
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(quantity)
                        .ok_or(CartError::QuantityOverflow)?;
                    existing.clone()
                }
                None => {
                    let line = CartItem::from_product(product, quantity);
                    items.push(line.clone());
                    line
                }
            };
            Ok(line)
        })
    }

    /// Remove a line. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted.
    pub fn remove_from_cart(&self, product_id: &ProductId) -> Result<(), CartError> {
        self.mutate(|items| {
            items.retain(|item| &item.product_id != product_id);
            Ok(())
        })
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotInCart` when a positive quantity targets an absent product,
    /// `TotalOverflow` if the new total does not fit, `Storage` if the cart
    /// cannot be persisted.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_from_cart(product_id);
        }
        self.mutate(|items| {
            let line = items
                .iter_mut()
                .find(|item| &item.product_id == product_id)
                .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
            line.quantity = quantity;
            Ok(())
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted.
    pub fn clear_cart(&self) -> Result<(), CartError> {
        self.mutate(|items| {
            items.clear();
            Ok(())
        })
    }

    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.state.lock().items.clone()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Sum of price times quantity over every line.
    #[must_use]
    pub fn total(&self) -> Price {
        self.inner.state.lock().total
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.quantity_of(product_id) > 0
    }

    /// Units of `product_id` in the cart (zero when absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }

    /// Apply `f` to a copy of the cart, persist it, then commit and publish.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<CartItem>) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let (result, snapshot) = {
            let mut state = self.inner.state.lock();
            let mut next = state.items.clone();
            let result = f(&mut next)?;
            let total = cart_total(&next).ok_or(CartError::TotalOverflow)?;
            storage::write_json(self.inner.storage.as_ref(), keys::CART, &next)?;
            state.items = next;
            state.total = total;
            (result, state.items.clone())
        };

        debug!(lines = snapshot.len(), "Cart updated");
        self.inner.events.publish(AppEvent::CartUpdated(snapshot));
        Ok(result)
    }
}

fn cart_total(items: &[CartItem]) -> Option<Price> {
    items
        .iter()
        .try_fold(Price::ZERO, |total, item| total.checked_add(item.line_total()?))
}

/// Drop zero-quantity lines and merge duplicate product ids.
fn sanitize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut clean: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|item| item.quantity > 0) {
        match clean.iter_mut().find(|c| c.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => clean.push(item),
        }
    }
    clean
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn cart() -> (Arc<MemoryStorage>, EventBus, CartStore) {
        let storage = Arc::new(MemoryStorage::new());
        let events = EventBus::default();
        let cart = CartStore::load(Arc::clone(&storage) as Arc<dyn Storage>, events.clone());
        (storage, events, cart)
    }

    fn product(id: &str, dollars: u32) -> ProductSummary {
        ProductSummary::new(id, format!("Product {id}"), Price::from(dollars))
    }

    fn pricey(id: &str) -> ProductSummary {
        let price: Price = serde_json::from_str("\"10000000000000000000000000000\"").unwrap();
        ProductSummary::new(id, "Prize bull", price)
    }

    #[test]
    fn test_add_merges_by_product_id() {
        let (_, _, cart) = cart();
        let apples = product("p1", 10);

        cart.add_to_cart(&apples, 2).unwrap();
        let line = cart.add_to_cart(&apples, 3).unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Price::from(50));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (storage, _, cart) = cart();
        assert!(matches!(
            cart.add_to_cart(&product("p1", 1), 0),
            Err(CartError::ZeroQuantity)
        ));
        assert!(cart.is_empty());
        assert!(!storage.contains_key(keys::CART));
    }

    #[test]
    fn test_update_to_zero_is_remove() {
        let (_, _, cart) = cart();
        let id = ProductId::from("p1");
        cart.add_to_cart(&product("p1", 4), 2).unwrap();
        cart.add_to_cart(&product("p2", 1), 1).unwrap();

        cart.update_quantity(&id, 7).unwrap();
        assert_eq!(cart.quantity_of(&id), 7);

        cart.update_quantity(&id, 0).unwrap();
        assert!(!cart.contains(&id));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_update_missing_product() {
        let (_, _, cart) = cart();
        let err = cart.update_quantity(&ProductId::from("ghost"), 2).unwrap_err();
        assert!(matches!(err, CartError::NotInCart(ref id) if id.as_str() == "ghost"));
        cart.remove_from_cart(&ProductId::from("ghost")).unwrap();
    }

    #[test]
    fn test_overflow_leaves_cart_unchanged() {
        let (_, _, cart) = cart();
        let p = product("p1", 1);
        cart.add_to_cart(&p, u32::MAX).unwrap();
        assert!(matches!(cart.add_to_cart(&p, 1), Err(CartError::QuantityOverflow)));
        assert_eq!(cart.quantity_of(&p.product_id), u32::MAX);
    }

    #[test]
    fn test_line_total_overflow_is_rejected() {
        let (storage, _, cart) = cart();
        assert!(matches!(
            cart.add_to_cart(&pricey("bull"), 10),
            Err(CartError::TotalOverflow)
        ));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
        assert!(!storage.contains_key(keys::CART));
    }

    #[test]
    fn test_cart_total_overflow_leaves_cart_unchanged() {
        let (_, _, cart) = cart();
        let bull = pricey("bull");
        cart.add_to_cart(&bull, 1).unwrap();
        let before = cart.total();

        // Each line fits on its own; the sum does not.
        assert!(matches!(
            cart.add_to_cart(&pricey("cow"), 7),
            Err(CartError::TotalOverflow)
        ));
        assert!(matches!(
            cart.update_quantity(&bull.product_id, 8),
            Err(CartError::TotalOverflow)
        ));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(&bull.product_id), 1);
        assert_eq!(cart.total(), before);

        cart.update_quantity(&bull.product_id, 7).unwrap();
        assert_eq!(cart.item_count(), 7);
    }

    #[test]
    fn test_load_discards_cart_whose_total_overflows() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                keys::CART,
                r#"[{"productId":"bull","name":"Bull","price":"10000000000000000000000000000","quantity":10}]"#,
            )
            .unwrap();
        let cart = CartStore::load(storage, EventBus::default());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_mutations_persist_and_publish() {
        let (storage, events, cart) = cart();
        let mut rx = events.subscribe();

        cart.add_to_cart(&product("p1", 3), 1).unwrap();
        match rx.try_recv().unwrap() {
            AppEvent::CartUpdated(items) => assert_eq!(items, cart.items()),
            other => panic!("unexpected event: {other:?}"),
        }

        let reloaded = CartStore::load(Arc::clone(&storage) as Arc<dyn Storage>, events.clone());
        assert_eq!(reloaded.items(), cart.items());

        cart.clear_cart().unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::CartUpdated(items) if items.is_empty()));
        assert_eq!(storage.get(keys::CART).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_load_treats_corrupt_cart_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::CART, "{\"oops\"").unwrap();
        let cart = CartStore::load(storage, EventBus::default());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_load_sanitizes_lines() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                keys::CART,
                r#"[
                    {"productId":"a","name":"A","price":"1.50","quantity":2},
                    {"productId":"a","name":"A","price":"1.50","quantity":1},
                    {"productId":"b","name":"B","price":2,"quantity":0}
                ]"#,
            )
            .unwrap();
        let cart = CartStore::load(storage, EventBus::default());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Price::from_cents(450));
    }
}
