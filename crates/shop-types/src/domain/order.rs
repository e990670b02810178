use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CartItem;
use super::status::{OrderStatus, PaymentStatus};
use super::{ProductId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip: String,
}

impl ShippingAddress {
    /// Returns the name of the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
            ("zip", &self.zip),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Line to be written into a new order; price is whatever the cart captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<&CartItem> for NewOrderItem {
    fn from(line: &CartItem) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(order_id: Uuid, item: NewOrderItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub shipping: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// A fresh, unpaid order. `total_amount` is fixed here and never derived
    /// from the items again.
    pub fn new(user_id: UserId, shipping: ShippingAddress, total_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount,
            shipping,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn update_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.updated_at = Utc::now();
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn can_be_refunded(&self) -> bool {
        self.status == OrderStatus::Delivered && self.payment_status == PaymentStatus::Paid
    }

    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.subtotal()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            address: "123 Test St".into(),
            city: "Test City".into(),
            country: "Test Country".into(),
            zip: "12345".into(),
        }
    }

    #[test]
    fn new_order_defaults_pending() {
        let order = Order::new(7, shipping(), Decimal::new(4297, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_amount.to_string(), "42.97");
        assert!(order.items.is_empty());
        assert!(order.can_be_cancelled());
        assert!(!order.can_be_refunded());
    }

    #[test]
    fn missing_shipping_field_is_reported() {
        let mut addr = shipping();
        assert_eq!(addr.missing_field(), None);
        addr.city = "   ".into();
        assert_eq!(addr.missing_field(), Some("city"));
        addr.address = String::new();
        assert_eq!(addr.missing_field(), Some("address"));
    }

    #[test]
    fn items_keep_order_id_and_price() {
        let order = Order::new(1, shipping(), Decimal::new(2198, 2));
        let item = OrderItem::new(
            order.id,
            NewOrderItem {
                product_id: 3,
                quantity: 2,
                price: Decimal::new(1099, 2),
            },
        );
        assert_eq!(item.order_id, order.id);
        assert_eq!(item.subtotal(), Some(Decimal::new(2198, 2)));
    }

    #[test]
    fn refund_requires_delivered_and_paid() {
        let mut order = Order::new(1, shipping(), Decimal::ONE);
        order.update_status(OrderStatus::Delivered);
        assert!(!order.can_be_refunded());
        assert!(!order.can_be_cancelled());
        order.update_payment_status(PaymentStatus::Paid);
        assert!(order.can_be_refunded());
    }

    #[test]
    fn update_status_mutates_timestamp() {
        let mut order = Order::new(1, shipping(), Decimal::ONE);
        let before = order.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        order.update_status(OrderStatus::Confirmed);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(order.updated_at > before);
    }
}
