//! Catalog products as the cart sees them.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use ahmed_mart_core::cart::CartItem;
use ahmed_mart_core::{ProductId, VendorId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: Option<VendorId>,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_value: String,
    pub unit_type: String,
    pub selling_price: Decimal,
    pub mrp: Decimal,
    pub max_quantity: i32,
    pub is_available: bool,
}

impl Product {
    /// A single-unit cart line for this product.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        CartItem {
            product_id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            unit_value: self.unit_value.clone(),
            unit_type: self.unit_type.clone(),
            selling_price: self.selling_price,
            mrp: self.mrp,
            quantity: 1,
            max_quantity: u32::try_from(self.max_quantity).unwrap_or(1),
            vendor_id: self.vendor_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_max_quantity_becomes_one() {
        let product = Product {
            id: ProductId::generate(),
            vendor_id: None,
            name: "Curd".to_string(),
            image_url: None,
            unit_value: "400".to_string(),
            unit_type: "g".to_string(),
            selling_price: Decimal::from(35),
            mrp: Decimal::from(40),
            max_quantity: -3,
            is_available: true,
        };
        let item = product.to_cart_item();
        assert_eq!(item.max_quantity, 1);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.product_id, product.id);
    }
}
