pub mod cart;
pub mod order;
pub mod paging;
pub mod product;
pub mod status;

/// Opaque caller identity handed over by the auth layer.
pub type UserId = i64;
pub type ProductId = i64;
