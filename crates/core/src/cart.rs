//! Cart lines and the cart state machine.
//!
//! [`Cart`] is the local, render-ready copy of a shopper's cart. Every
//! mutation is applied here first and returns a [`CartChange`] describing the
//! write the caller must replay against the remote cart table. The remote
//! write may fail without invalidating the local state; a later full resync
//! ([`Cart::replace_all`]) is the reconciliation point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::FREE_DELIVERY_THRESHOLD;
use crate::{ProductId, VendorId};

/// Flat delivery fee charged on carts below [`FREE_DELIVERY_THRESHOLD`].
///
/// This is the cart-level pricing used at checkout. It is deliberately
/// separate from the distance-tiered [`crate::geo::calculate_delivery_fee`].
pub const FLAT_DELIVERY_FEE: Decimal = Decimal::from_parts(29, 0, 0, false, 0);

/// One product line in the cart. Invariant: `1 <= quantity <= max_quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    /// Pack size, e.g. `"500"`.
    pub unit_value: String,
    /// Pack unit, e.g. `"g"`.
    pub unit_type: String,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub quantity: u32,
    pub max_quantity: u32,
    pub vendor_id: Option<VendorId>,
}

impl CartItem {
    /// `selling_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.selling_price * Decimal::from(self.quantity)
    }

    /// Bring the line back inside its quantity bounds.
    fn normalize(&mut self) {
        self.max_quantity = self.max_quantity.max(1);
        self.quantity = self.quantity.clamp(1, self.max_quantity);
    }
}

/// The remote write that mirrors a local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// Nothing changed locally; no remote write is needed.
    None,
    /// Insert or update the `(user, product)` row with this quantity.
    Upsert { product_id: ProductId, quantity: u32 },
    /// Update the quantity column of an existing row.
    SetQuantity { product_id: ProductId, quantity: u32 },
    /// Delete the `(user, product)` row.
    Delete { product_id: ProductId },
}

/// A shopper's cart, keyed by product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from stored lines, enforcing bounds and key uniqueness.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new();
        cart.replace_all(items);
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    fn get_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    /// Add one unit of a product.
    ///
    /// An existing line is incremented, silently capped at `max_quantity`;
    /// a new line starts at quantity 1.
    pub fn add_item(&mut self, mut item: CartItem) -> CartChange {
        let product_id = item.product_id;

        let quantity = if let Some(existing) = self.get_mut(product_id) {
            existing.quantity = existing
                .quantity
                .saturating_add(1)
                .min(existing.max_quantity);
            existing.quantity
        } else {
            item.quantity = 1;
            item.normalize();
            self.items.push(item);
            1
        };

        CartChange::Upsert {
            product_id,
            quantity,
        }
    }

    /// Drop a line. The remote delete is issued even when the line was not
    /// held locally, since another device may have added it.
    pub fn remove_item(&mut self, product_id: ProductId) -> CartChange {
        self.items.retain(|i| i.product_id != product_id);
        CartChange::Delete { product_id }
    }

    /// Set a line's quantity. `quantity <= 0` removes the line; anything else
    /// is clamped to `[1, max_quantity]`.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> CartChange {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        let Some(item) = self.get_mut(product_id) else {
            return CartChange::None;
        };

        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        item.quantity = requested.clamp(1, item.max_quantity);

        CartChange::SetQuantity {
            product_id,
            quantity: item.quantity,
        }
    }

    /// Add one unit to an existing line; a no-op at `max_quantity`.
    pub fn increment_quantity(&mut self, product_id: ProductId) -> CartChange {
        match self.get(product_id) {
            Some(item) if item.quantity < item.max_quantity => {
                let next = i64::from(item.quantity) + 1;
                self.update_quantity(product_id, next)
            }
            _ => CartChange::None,
        }
    }

    /// Take one unit off a line; at quantity 1 the line is removed.
    pub fn decrement_quantity(&mut self, product_id: ProductId) -> CartChange {
        match self.get(product_id) {
            Some(item) => {
                let next = i64::from(item.quantity) - 1;
                self.update_quantity(product_id, next)
            }
            None => CartChange::None,
        }
    }

    /// Replace every line with an authoritative copy.
    ///
    /// Lines are normalized into their bounds; a repeated product keeps its
    /// last occurrence.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = CartItem>) {
        self.items.clear();
        for mut item in items {
            item.normalize();
            match self.get_mut(item.product_id) {
                Some(existing) => *existing = item,
                None => self.items.push(item),
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Quantity of a product in the cart, `0` when absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.get(product_id).map_or(0, |i| i.quantity)
    }

    /// `Σ selling_price × quantity`.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// `Σ quantity`.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Flat cart-level delivery fee: free from 199, otherwise 29.
    #[must_use]
    pub fn delivery_fee(&self) -> Decimal {
        if self.total_amount() >= FREE_DELIVERY_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_DELIVERY_FEE
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(price: i64, mrp: i64, max_quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            name: "Toor Dal".to_string(),
            image_url: None,
            unit_value: "1".to_string(),
            unit_type: "kg".to_string(),
            selling_price: Decimal::from(price),
            mrp: Decimal::from(mrp),
            quantity: 1,
            max_quantity,
            vendor_id: None,
        }
    }

    #[test]
    fn test_add_same_product_twice_merges() {
        let mut cart = Cart::new();
        let dal = item(100, 120, 5);
        cart.add_item(dal.clone());
        let change = cart.add_item(dal.clone());

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_quantity(dal.product_id), 2);
        assert_eq!(
            change,
            CartChange::Upsert {
                product_id: dal.product_id,
                quantity: 2
            }
        );
    }

    #[test]
    fn test_add_never_exceeds_max() {
        let mut cart = Cart::new();
        let ghee = item(550, 600, 2);
        for _ in 0..5 {
            cart.add_item(ghee.clone());
        }
        assert_eq!(cart.item_quantity(ghee.product_id), 2);
    }

    #[test]
    fn test_add_ignores_incoming_quantity() {
        let mut cart = Cart::new();
        let mut rice = item(80, 90, 10);
        rice.quantity = 7;
        cart.add_item(rice.clone());
        assert_eq!(cart.item_quantity(rice.product_id), 1);
    }

    #[test]
    fn test_zero_max_quantity_is_normalized() {
        let mut cart = Cart::new();
        let salt = item(20, 25, 0);
        cart.add_item(salt.clone());
        let line = cart.get(salt.product_id).unwrap();
        assert_eq!((line.quantity, line.max_quantity), (1, 1));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        let milk = item(30, 32, 6);
        cart.add_item(milk.clone());

        let change = cart.update_quantity(milk.product_id, 0);
        assert!(cart.is_empty());
        assert_eq!(
            change,
            CartChange::Delete {
                product_id: milk.product_id
            }
        );
    }

    #[test]
    fn test_update_quantity_clamps() {
        let mut cart = Cart::new();
        let eggs = item(84, 90, 4);
        cart.add_item(eggs.clone());

        assert_eq!(
            cart.update_quantity(eggs.product_id, 99),
            CartChange::SetQuantity {
                product_id: eggs.product_id,
                quantity: 4
            }
        );
        assert_eq!(cart.item_quantity(eggs.product_id), 4);
    }

    #[test]
    fn test_update_unknown_line_is_noop() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.update_quantity(ProductId::generate(), 3),
            CartChange::None
        );
    }

    #[test]
    fn test_increment_is_noop_at_max() {
        let mut cart = Cart::new();
        let oil = item(180, 200, 1);
        cart.add_item(oil.clone());
        assert_eq!(cart.increment_quantity(oil.product_id), CartChange::None);
        assert_eq!(cart.item_quantity(oil.product_id), 1);
    }

    #[test]
    fn test_decrement_at_one_removes() {
        let mut cart = Cart::new();
        let bread = item(45, 50, 3);
        cart.add_item(bread.clone());
        cart.increment_quantity(bread.product_id);
        cart.decrement_quantity(bread.product_id);
        assert_eq!(cart.item_quantity(bread.product_id), 1);

        let change = cart.decrement_quantity(bread.product_id);
        assert!(cart.get(bread.product_id).is_none());
        assert!(matches!(change, CartChange::Delete { .. }));
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        let a = item(100, 120, 5);
        let b = item(35, 40, 5);
        cart.add_item(a.clone());
        cart.add_item(a.clone());
        cart.add_item(b.clone());

        assert_eq!(cart.total_amount(), Decimal::from(235));
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_two_units_at_100_ship_free() {
        let mut cart = Cart::new();
        let line = item(100, 120, 5);
        cart.add_item(line.clone());
        cart.update_quantity(line.product_id, 2);

        assert_eq!(cart.total_amount(), Decimal::from(200));
        assert_eq!(cart.delivery_fee(), Decimal::ZERO);
    }

    #[test]
    fn test_flat_fee_below_threshold() {
        let mut cart = Cart::new();
        cart.add_item(item(198, 200, 1));
        assert_eq!(cart.delivery_fee(), FLAT_DELIVERY_FEE);

        cart.clear();
        assert_eq!(cart.delivery_fee(), FLAT_DELIVERY_FEE);
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_replace_all_normalizes_and_dedupes() {
        let mut stale = item(10, 10, 3);
        stale.quantity = 9;
        let mut fresh = stale.clone();
        fresh.quantity = 2;
        fresh.selling_price = Decimal::from(12);

        let mut cart = Cart::new();
        cart.add_item(item(1, 1, 1));
        cart.replace_all(vec![stale, fresh]);

        assert_eq!(cart.len(), 1);
        let line = cart.items().first().unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.selling_price, Decimal::from(12));
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut cart = Cart::new();
        cart.add_item(item(100, 120, 5));
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
