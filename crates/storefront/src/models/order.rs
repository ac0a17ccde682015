//! Persisted orders and order lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

use ahmed_mart_core::order::{AddressSnapshot, ProductSnapshot};
use ahmed_mart_core::{
    DeliveryPartnerId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    UserId, VendorId,
};

/// An order row.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub vendor_id: Option<VendorId>,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub delivery_address: Json<AddressSnapshot>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub platform_fee: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub customer_notes: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line with its frozen product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_snapshot: Json<ProductSnapshot>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub mrp: Decimal,
    pub discount_amount: Decimal,
    pub total_price: Decimal,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
