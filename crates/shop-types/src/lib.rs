//! shop-types: domain model and port traits shared by the adapters and the
//! service layer.

pub mod domain;
pub mod ports;
