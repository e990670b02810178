use async_trait::async_trait;

use super::RepoError;
use crate::domain::cart::CartItem;
use crate::domain::{ProductId, UserId};

#[async_trait]
pub trait CartRepository: Send + Sync + 'static {
    /// Fails with [`RepoError::Conflict`] if the (user, product) line exists.
    async fn create(&self, item: CartItem) -> Result<CartItem, RepoError>;
    async fn update(&self, item: CartItem) -> Result<CartItem, RepoError>;
    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepoError>;
    async fn get_by_user_and_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepoError>;
    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepoError>;
    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64, RepoError>;
}
