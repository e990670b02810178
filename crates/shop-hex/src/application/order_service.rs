use std::sync::Arc;

use crate::application::cart_service::CartService;
use crate::errors::AppError;
use shop_types::domain::cart::cart_total;
use shop_types::domain::order::{NewOrderItem, Order, ShippingAddress};
use shop_types::domain::paging::{Page, Paging};
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::domain::UserId;
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::order_repository::{OrderRepository, OrderTransaction};
use shop_types::ports::product_catalog::ProductCatalog;
use shop_types::ports::RepoError;
use uuid::Uuid;

pub struct OrderService<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    orders: O,
    carts: Arc<CartService<C, P>>,
}

impl<O, C, P> OrderService<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    pub fn new(orders: O, carts: Arc<CartService<C, P>>) -> Self {
        Self { orders, carts }
    }

    /// Turns the user's cart into an order.
    ///
    /// Order row and item rows are written on one transaction; any failure
    /// before commit leaves neither behind. The cart is cleared after commit
    /// and a failure there is only logged.
    pub async fn create_order(
        &self,
        user_id: UserId,
        shipping: ShippingAddress,
    ) -> Result<Order, AppError> {
        if let Some(field) = shipping.missing_field() {
            return Err(AppError::InvalidShippingAddress(field));
        }

        let lines = self.carts.get_items(user_id).await?;
        if lines.is_empty() {
            return Err(AppError::CartEmpty);
        }
        let total = cart_total(&lines).ok_or(AppError::TotalOverflow)?;

        let mut tx = self
            .orders
            .begin()
            .await
            .map_err(AppError::CannotCreateOrder)?;
        let mut order = tx
            .create(Order::new(user_id, shipping, total))
            .await
            .map_err(AppError::CannotCreateOrder)?;
        let items = tx
            .create_order_items(order.id, lines.iter().map(NewOrderItem::from).collect())
            .await
            .map_err(AppError::CannotCreateOrderItems)?;
        tx.commit().await.map_err(AppError::CannotCreateOrder)?;
        order.items = items;

        tracing::info!(
            order_id = %order.id,
            user_id,
            total = %order.total_amount,
            items = order.items.len(),
            "order created"
        );

        if let Err(e) = self.carts.remove_all_items(user_id).await {
            tracing::warn!(order_id = %order.id, user_id, error = %e, "cart cleanup failed");
        }

        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        match self.orders.get_by_id(id).await {
            Ok(o) => Ok(o),
            Err(RepoError::NotFound) => Err(AppError::OrderNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user_orders(
        &self,
        user_id: UserId,
        paging: Paging,
    ) -> Result<Page<Order>, AppError> {
        Ok(self.orders.get_by_user_id(user_id, paging).await?)
    }

    pub async fn update_order_status(&self, id: Uuid, raw: &str) -> Result<Order, AppError> {
        let next: OrderStatus = raw
            .parse()
            .map_err(|_| AppError::InvalidOrderStatus(raw.to_string()))?;
        let current = self.get_order(id).await?.status;
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        match self.orders.update_status(id, current, next).await {
            Ok(order) => {
                tracing::info!(order_id = %id, from = %current, to = %next, "order status changed");
                Ok(order)
            }
            // Someone else moved the order since it was read.
            Err(RepoError::Conflict(_)) => Err(AppError::InvalidStatusTransition {
                from: current,
                to: next,
            }),
            Err(RepoError::NotFound) => Err(AppError::OrderNotFound(id)),
            Err(e) => Err(AppError::CannotUpdateOrder(e)),
        }
    }

    pub async fn update_payment_status(&self, id: Uuid, raw: &str) -> Result<Order, AppError> {
        let next: PaymentStatus = raw
            .parse()
            .map_err(|_| AppError::InvalidPaymentStatus(raw.to_string()))?;
        let current = self.get_order(id).await?.payment_status;
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidPaymentStatusTransition {
                from: current,
                to: next,
            });
        }

        match self.orders.update_payment_status(id, current, next).await {
            Ok(order) => {
                tracing::info!(order_id = %id, from = %current, to = %next, "payment status changed");
                Ok(order)
            }
            Err(RepoError::Conflict(_)) => Err(AppError::InvalidPaymentStatusTransition {
                from: current,
                to: next,
            }),
            Err(RepoError::NotFound) => Err(AppError::OrderNotFound(id)),
            Err(e) => Err(AppError::CannotUpdateOrder(e)),
        }
    }
}
