//! Order assembly and status-change permissions.
//!
//! An order freezes everything it depends on at placement time: the delivery
//! address and each product's display fields are copied into snapshots, so
//! later edits to the address book or the catalog never rewrite history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Role;
use crate::cart::{Cart, CartItem};
use crate::{AddressType, OrderStatus, PaymentMethod, PaymentStatus, ProductId, VendorId};

/// Fixed per-order platform fee.
pub const PLATFORM_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Frozen copy of the delivery address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub address_type: AddressType,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Frozen copy of a product's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub image_url: Option<String>,
    pub unit_value: String,
    pub unit_type: String,
    pub selling_price: Decimal,
    pub mrp: Decimal,
}

impl From<&CartItem> for ProductSnapshot {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            unit_value: item.unit_value.clone(),
            unit_type: item.unit_type.clone(),
            selling_price: item.selling_price,
            mrp: item.mrp,
        }
    }
}

/// Failures while turning a cart into an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("cannot place an order with an empty cart")]
    EmptyCart,
}

/// One order line, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDraft {
    pub product_id: ProductId,
    pub product_snapshot: ProductSnapshot,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub mrp: Decimal,
    /// `(mrp − unit_price) × quantity`.
    pub discount_amount: Decimal,
    /// `unit_price × quantity`.
    pub total_price: Decimal,
}

impl OrderLineDraft {
    #[must_use]
    pub fn from_cart_item(item: &CartItem) -> Self {
        let quantity = Decimal::from(item.quantity);
        let unit_price = item.selling_price;
        let discount_amount = (item.mrp - unit_price) * quantity;

        Self {
            product_id: item.product_id,
            product_snapshot: ProductSnapshot::from(item),
            quantity: item.quantity,
            unit_price,
            mrp: item.mrp,
            discount_amount,
            total_price: unit_price * quantity,
        }
    }
}

/// A fully priced order, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// The single vendor every line belongs to, or `None` for mixed carts.
    pub vendor_id: Option<VendorId>,
    pub delivery_address: AddressSnapshot,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub platform_fee: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub customer_notes: Option<String>,
    pub items: Vec<OrderLineDraft>,
}

impl OrderDraft {
    /// Price a cart for checkout.
    ///
    /// Delivery uses the flat cart-level fee, not the distance tiers.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::EmptyCart`] when the cart has no lines.
    pub fn assemble(
        cart: &Cart,
        delivery_address: AddressSnapshot,
        payment_method: PaymentMethod,
        customer_notes: Option<String>,
    ) -> Result<Self, AssemblyError> {
        if cart.is_empty() {
            return Err(AssemblyError::EmptyCart);
        }

        let items: Vec<OrderLineDraft> = cart
            .items()
            .iter()
            .map(OrderLineDraft::from_cart_item)
            .collect();

        let subtotal = cart.total_amount();
        let delivery_fee = cart.delivery_fee();
        let discount_amount = Decimal::ZERO;

        Ok(Self {
            vendor_id: common_vendor(cart.items()),
            delivery_address,
            subtotal,
            delivery_fee,
            platform_fee: PLATFORM_FEE,
            discount_amount,
            total_amount: subtotal + delivery_fee + PLATFORM_FEE - discount_amount,
            payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            customer_notes: customer_notes.filter(|n| !n.trim().is_empty()),
            items,
        })
    }
}

fn common_vendor(items: &[CartItem]) -> Option<VendorId> {
    let first = items.first()?.vendor_id?;
    items
        .iter()
        .all(|i| i.vendor_id == Some(first))
        .then_some(first)
}

/// Human-facing order reference: base-36 timestamp followed by a base-36
/// random suffix, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Width the suffix is zero-padded to.
    pub const SUFFIX_WIDTH: usize = 4;

    /// Upper bound (exclusive) for the random suffix.
    pub const SUFFIX_SPACE: u64 = 36u64.pow(4);

    #[must_use]
    pub fn from_parts(timestamp_millis: u64, suffix: u64) -> Self {
        let suffix = base36(suffix % Self::SUFFIX_SPACE);
        Self(format!(
            "{}{suffix:0>width$}",
            base36(timestamp_millis),
            width = Self::SUFFIX_WIDTH
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(char::from(DIGITS[(n % 36) as usize]));
        n /= 36;
    }
    out.iter().rev().collect()
}

/// Whether `role` is allowed to move an order into `target`.
///
/// This is the per-role permission only; callers still check
/// [`OrderStatus::can_transition_to`] against the current status.
#[must_use]
pub const fn actor_may_set(role: Role, target: OrderStatus) -> bool {
    match role {
        Role::Admin => true,
        Role::Customer => matches!(target, OrderStatus::Cancelled),
        Role::Vendor => matches!(
            target,
            OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::ReadyForPickup
        ),
        Role::DeliveryPartner => matches!(
            target,
            OrderStatus::PickedUp | OrderStatus::OutForDelivery | OrderStatus::Delivered
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::item;

    fn address() -> AddressSnapshot {
        AddressSnapshot {
            address_type: AddressType::Home,
            address_line1: "14, 2nd Cross".to_string(),
            address_line2: None,
            landmark: Some("Near temple".to_string()),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560038".to_string(),
            latitude: Some(12.97),
            longitude: Some(77.64),
        }
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let result = OrderDraft::assemble(&Cart::new(), address(), PaymentMethod::Cod, None);
        assert_eq!(result, Err(AssemblyError::EmptyCart));
    }

    #[test]
    fn test_totals_hold_the_invariant() {
        let mut cart = Cart::new();
        let atta = item(100, 120, 5);
        cart.add_item(atta.clone());
        cart.update_quantity(atta.product_id, 2);

        let draft = OrderDraft::assemble(&cart, address(), PaymentMethod::Upi, None).unwrap();
        assert_eq!(draft.subtotal, Decimal::from(200));
        assert_eq!(draft.delivery_fee, Decimal::ZERO);
        assert_eq!(draft.platform_fee, Decimal::from(5));
        assert_eq!(
            draft.total_amount,
            draft.subtotal + draft.delivery_fee + draft.platform_fee - draft.discount_amount
        );
        assert_eq!(draft.total_amount, Decimal::from(205));
        assert_eq!(draft.status, OrderStatus::Pending);
        assert_eq!(draft.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_flat_fee_applies_below_threshold() {
        let mut cart = Cart::new();
        cart.add_item(item(50, 55, 3));
        let draft = OrderDraft::assemble(&cart, address(), PaymentMethod::Cod, None).unwrap();
        assert_eq!(draft.delivery_fee, Decimal::from(29));
        assert_eq!(draft.total_amount, Decimal::from(84));
    }

    #[test]
    fn test_line_math() {
        let mut cart = Cart::new();
        let paneer = item(90, 100, 5);
        let at_mrp = item(50, 50, 5);
        cart.add_item(paneer.clone());
        cart.update_quantity(paneer.product_id, 3);
        cart.add_item(at_mrp.clone());
        cart.update_quantity(at_mrp.product_id, 2);

        let draft = OrderDraft::assemble(&cart, address(), PaymentMethod::Card, None).unwrap();
        let first = draft.items.first().unwrap();
        assert_eq!(first.total_price, Decimal::from(270));
        assert_eq!(first.discount_amount, Decimal::from(30));
        assert_eq!(first.product_snapshot.name, paneer.name);

        let second = draft.items.get(1).unwrap();
        assert_eq!(second.discount_amount, Decimal::ZERO);
        assert_eq!(second.total_price, Decimal::from(100));
    }

    #[test]
    fn test_line_discount_follows_mrp_gap() {
        let line = OrderLineDraft::from_cart_item(&item(60, 50, 5));
        assert_eq!(line.discount_amount, (line.mrp - line.unit_price) * Decimal::ONE);
        assert_eq!(line.discount_amount, Decimal::from(-10));
    }

    #[test]
    fn test_vendor_resolution() {
        let vendor = VendorId::generate();
        let mut a = item(10, 10, 2);
        let mut b = item(20, 20, 2);
        a.vendor_id = Some(vendor);
        b.vendor_id = Some(vendor);

        let cart = Cart::from_items(vec![a.clone(), b.clone()]);
        let draft = OrderDraft::assemble(&cart, address(), PaymentMethod::Cod, None).unwrap();
        assert_eq!(draft.vendor_id, Some(vendor));

        b.vendor_id = Some(VendorId::generate());
        let mixed = Cart::from_items(vec![a, b]);
        let draft = OrderDraft::assemble(&mixed, address(), PaymentMethod::Cod, None).unwrap();
        assert_eq!(draft.vendor_id, None);
    }

    #[test]
    fn test_blank_notes_are_dropped() {
        let cart = Cart::from_items(vec![item(10, 10, 1)]);
        let draft =
            OrderDraft::assemble(&cart, address(), PaymentMethod::Cod, Some("  ".to_string()))
                .unwrap();
        assert_eq!(draft.customer_notes, None);
    }

    #[test]
    fn test_order_number_format() {
        let number = OrderNumber::from_parts(1_700_000_000_000, 35);
        assert_eq!(number.as_str(), "LOYW3V28000Z");
        assert_eq!(OrderNumber::from_parts(0, 0).as_str(), "00000");
        assert!(
            number
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_actor_permissions() {
        assert!(actor_may_set(Role::Vendor, OrderStatus::Confirmed));
        assert!(!actor_may_set(Role::Vendor, OrderStatus::PickedUp));
        assert!(actor_may_set(Role::DeliveryPartner, OrderStatus::Delivered));
        assert!(!actor_may_set(Role::DeliveryPartner, OrderStatus::Cancelled));
        assert!(!actor_may_set(Role::Customer, OrderStatus::Confirmed));
        assert!(actor_may_set(Role::Admin, OrderStatus::AssignedToDelivery));
    }
}
