pub mod cart_repository;
pub mod order_repository;
pub mod product_catalog;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("db error: {0}")]
    DbError(String),
}
