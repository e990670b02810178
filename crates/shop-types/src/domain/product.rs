use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}
