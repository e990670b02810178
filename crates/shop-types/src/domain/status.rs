use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an order from checkout to delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// Settlement state of the order's payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

const ORDER_TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (
        OrderStatus::Pending,
        &[OrderStatus::Confirmed, OrderStatus::Cancelled],
    ),
    (
        OrderStatus::Confirmed,
        &[OrderStatus::Processing, OrderStatus::Cancelled],
    ),
    (OrderStatus::Processing, &[OrderStatus::Shipped]),
    (OrderStatus::Shipped, &[OrderStatus::Delivered]),
    (OrderStatus::Delivered, &[OrderStatus::Refunded]),
];

const PAYMENT_TRANSITIONS: &[(PaymentStatus, &[PaymentStatus])] = &[
    (
        PaymentStatus::Pending,
        &[PaymentStatus::Paid, PaymentStatus::Failed],
    ),
    (PaymentStatus::Paid, &[PaymentStatus::Refunded]),
    (PaymentStatus::Failed, &[PaymentStatus::Pending]),
];

fn allowed<S: PartialEq + Copy>(table: &'static [(S, &'static [S])], current: S) -> &'static [S] {
    table
        .iter()
        .find(|(from, _)| *from == current)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    /// Whether `raw` names one of the order states.
    pub fn is_valid(raw: &str) -> bool {
        raw.parse::<Self>().is_ok()
    }

    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        allowed(ORDER_TRANSITIONS, self)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Whether `raw` names one of the payment states.
    pub fn is_valid(raw: &str) -> bool {
        raw.parse::<Self>().is_ok()
    }

    pub fn allowed_transitions(self) -> &'static [PaymentStatus] {
        allowed(PAYMENT_TRANSITIONS, self)
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_table_matches_lifecycle() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));

        for next in OrderStatus::ALL {
            assert_eq!(
                OrderStatus::Delivered.can_transition_to(next),
                next == OrderStatus::Refunded
            );
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
            assert!(!OrderStatus::Refunded.can_transition_to(next));
        }
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn payment_table_matches_lifecycle() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::Refunded));
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Pending));
        assert!(PaymentStatus::Refunded.is_terminal());
    }

    #[test]
    fn labels_parse_back_exactly() {
        for st in OrderStatus::ALL {
            assert_eq!(st.as_str().parse::<OrderStatus>().unwrap(), st);
        }
        assert!(OrderStatus::is_valid("SHIPPED"));
        assert!(!OrderStatus::is_valid("shipped"));
        assert!(!OrderStatus::is_valid("SHIPED"));
        assert!(PaymentStatus::is_valid("PAID"));
        assert!(!PaymentStatus::is_valid("CONFIRMED"));
    }

    #[test]
    fn serde_uses_upper_case_labels() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let back: PaymentStatus = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(back, PaymentStatus::Refunded);
    }
}
