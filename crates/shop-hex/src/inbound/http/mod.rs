mod auth;
mod server;

pub use auth::{AuthUser, USER_ID_HEADER};
pub use server::{HttpServer, HttpServerConfig};
