use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProductId, UserId};

/// One (user, product) line. `price` is the catalog price at the moment the
/// line was first added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(user_id: UserId, product_id: ProductId, quantity: i32, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge another add of the same product into this line. Returns the new
    /// quantity, or `None` on overflow with the line left untouched.
    pub fn add_quantity(&mut self, quantity: i32) -> Option<i32> {
        let merged = self.quantity.checked_add(quantity)?;
        self.quantity = merged;
        self.updated_at = Utc::now();
        Some(merged)
    }

    pub fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
        self.updated_at = Utc::now();
    }

    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Σ price × quantity over a cart snapshot; `None` if it leaves the
/// `Decimal` range.
pub fn cart_total(lines: &[CartItem]) -> Option<Decimal> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.subtotal()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_exact() {
        let lines = vec![
            CartItem::new(1, 1, 2, Decimal::new(1099, 2)),
            CartItem::new(1, 2, 1, Decimal::new(2099, 2)),
        ];
        assert_eq!(cart_total(&lines), Some(Decimal::new(4297, 2)));
        assert_eq!(cart_total(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn total_out_of_range_is_none() {
        let lines = vec![
            CartItem::new(1, 1, 2, Decimal::MAX),
            CartItem::new(1, 2, 1, Decimal::ONE),
        ];
        assert_eq!(lines[0].subtotal(), None);
        assert_eq!(cart_total(&lines), None);

        let near_max = vec![
            CartItem::new(1, 1, 1, Decimal::MAX),
            CartItem::new(1, 2, 1, Decimal::ONE),
        ];
        assert_eq!(cart_total(&near_max), None);
    }

    #[test]
    fn add_quantity_merges_and_keeps_price() {
        let mut line = CartItem::new(1, 1, 3, Decimal::new(100, 0));
        assert_eq!(line.add_quantity(2), Some(5));
        assert_eq!(line.quantity, 5);
        assert_eq!(line.price, Decimal::new(100, 0));
        line.set_quantity(1);
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn add_quantity_overflow_leaves_line_alone() {
        let mut line = CartItem::new(1, 1, i32::MAX, Decimal::ONE);
        let before = line.updated_at;
        assert_eq!(line.add_quantity(5), None);
        assert_eq!(line.quantity, i32::MAX);
        assert_eq!(line.updated_at, before);
    }
}
