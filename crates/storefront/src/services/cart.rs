//! Shopping cart persisted to local storage.
//!
//! Lines are unique by `(item id, tier)`: adding an item again with the same
//! tier bumps the quantity, a different tier adds a second line. Every
//! mutation rewrites the whole list under `zona_gamer_cart`.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use zona_gamer_core::{AccountTier, Currency};

use crate::models::session::keys;
use crate::models::{CartItem, ItemSummary};
use crate::storage::LocalStorage;

/// Cart lines plus their persisted copy.
pub struct CartService {
    storage: Arc<dyn LocalStorage>,
    items: RwLock<Vec<CartItem>>,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("lines", &self.items().len())
            .finish_non_exhaustive()
    }
}

impl CartService {
    /// Build the cart from whatever is persisted. Missing or unreadable data
    /// gives an empty cart.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let items = load(storage.as_ref());
        Self {
            storage,
            items: RwLock::new(items),
        }
    }

    /// Snapshot of the cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.items.read().map_or_else(|_| Vec::new(), |items| items.clone())
    }

    /// Add `quantity` units of `item` at `tier`, merging with an existing line.
    #[instrument(skip(self, item), fields(id = %item.id))]
    pub fn add_to_cart(&self, item: ItemSummary, quantity: u32, tier: Option<AccountTier>) {
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|l| l.matches(item.id.as_str(), tier)) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                items.push(CartItem {
                    item,
                    quantity,
                    selected_tier: tier,
                });
            }
        });
    }

    /// Drop the line for `id` at `tier`, if any.
    pub fn remove_from_cart(&self, id: &str, tier: Option<AccountTier>) {
        self.mutate(|items| items.retain(|l| !l.matches(id, tier)));
    }

    /// Set the quantity of a line. Zero or less removes it.
    pub fn update_quantity(&self, id: &str, tier: Option<AccountTier>, quantity: i64) {
        self.mutate(|items| {
            if quantity <= 0 {
                items.retain(|l| !l.matches(id, tier));
            } else if let Some(line) = items.iter_mut().find(|l| l.matches(id, tier)) {
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }
        });
    }

    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    /// Units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items().iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of the line totals in `currency`.
    #[must_use]
    pub fn total_price(&self, currency: Currency) -> Decimal {
        self.items().iter().map(|l| l.line_total(currency)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().map_or(true, |items| items.is_empty())
    }

    /// Whether any line, at any tier, holds `id`.
    #[must_use]
    pub fn is_in_cart(&self, id: &str) -> bool {
        self.items().iter().any(|l| l.item.id.as_str() == id)
    }

    /// Units of `id` across all its tiers.
    #[must_use]
    pub fn item_quantity(&self, id: &str) -> u64 {
        self.items()
            .iter()
            .filter(|l| l.item.id.as_str() == id)
            .map(|l| u64::from(l.quantity))
            .sum()
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<CartItem>)) {
        let Ok(mut items) = self.items.write() else {
            warn!("Cart lock poisoned, change dropped");
            return;
        };
        f(&mut items);
        save(self.storage.as_ref(), &items);
    }
}

fn load(storage: &dyn LocalStorage) -> Vec<CartItem> {
    match storage.get_item(keys::CART) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Stored cart is corrupted, starting empty");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart");
            Vec::new()
        }
    }
}

fn save(storage: &dyn LocalStorage, items: &[CartItem]) {
    let raw = match serde_json::to_string(items) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Failed to serialize cart");
            return;
        }
    };
    if let Err(e) = storage.set_item(keys::CART, &raw) {
        warn!(error = %e, "Failed to save cart");
    } else {
        debug!(lines = items.len(), "Cart saved");
    }
}
