use async_trait::async_trait;

use super::RepoError;
use crate::domain::product::Product;
use crate::domain::ProductId;

/// Read-only view of the catalog, used for price lookups.
#[async_trait]
pub trait ProductCatalog: Send + Sync + 'static {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError>;
}
