//! shop-hex: cart and checkout services plus their HTTP adapter.

pub mod config;
pub mod errors;

pub mod application;

pub use shop_types::{domain, ports};

pub mod inbound;
