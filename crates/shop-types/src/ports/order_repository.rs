use async_trait::async_trait;
use uuid::Uuid;

use super::RepoError;
use crate::domain::order::{NewOrderItem, Order, OrderItem};
use crate::domain::paging::{Page, Paging};
use crate::domain::status::{OrderStatus, PaymentStatus};
use crate::domain::UserId;

/// Write half of checkout. Nothing written through a transaction is visible
/// until [`OrderTransaction::commit`] succeeds; dropping it rolls back.
#[async_trait]
pub trait OrderTransaction: Send {
    async fn create(&mut self, order: Order) -> Result<Order, RepoError>;

    async fn create_order_items(
        &mut self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, RepoError>;

    async fn commit(self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    type Tx: OrderTransaction + 'static;

    async fn begin(&self) -> Result<Self::Tx, RepoError>;

    /// Order with its items, or [`RepoError::NotFound`].
    async fn get_by_id(&self, id: Uuid) -> Result<Order, RepoError>;

    /// Newest first. `total` counts every order of the user.
    async fn get_by_user_id(
        &self,
        user_id: UserId,
        paging: Paging,
    ) -> Result<Page<Order>, RepoError>;

    /// Moves `status` from `expected` to `status`. Fails with
    /// [`RepoError::Conflict`] if the stored value is no longer `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepoError>;

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Order, RepoError>;
}
