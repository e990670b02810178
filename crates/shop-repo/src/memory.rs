use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shop_types::domain::cart::CartItem;
use shop_types::domain::order::{NewOrderItem, Order, OrderItem};
use shop_types::domain::paging::{Page, Paging};
use shop_types::domain::product::Product;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::domain::{ProductId, UserId};
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::order_repository::{OrderRepository, OrderTransaction};
use shop_types::ports::product_catalog::ProductCatalog;
use shop_types::ports::RepoError;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryStore {
    pub carts: Arc<DashMap<(UserId, ProductId), CartItem>>,
    pub orders: Arc<DashMap<Uuid, Order>>,
    pub products: Arc<DashMap<ProductId, Product>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            carts: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
            products: Arc::new(DashMap::new()),
        }
    }

    /// Seed the catalog.
    pub fn insert_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        Ok(self.products.get(&id).map(|r| r.clone()))
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn create(&self, item: CartItem) -> Result<CartItem, RepoError> {
        match self.carts.entry((item.user_id, item.product_id)) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "cart line ({}, {}) exists",
                item.user_id, item.product_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
                Ok(item)
            }
        }
    }

    async fn update(&self, item: CartItem) -> Result<CartItem, RepoError> {
        match self.carts.get_mut(&(item.user_id, item.product_id)) {
            Some(mut v) => {
                v.quantity = item.quantity;
                v.updated_at = item.updated_at;
                Ok(v.clone())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepoError> {
        Ok(self.carts.remove(&(user_id, product_id)).is_some())
    }

    async fn get_by_user_and_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepoError> {
        Ok(self.carts.get(&(user_id, product_id)).map(|r| r.clone()))
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepoError> {
        Ok(self
            .carts
            .iter()
            .filter(|kv| kv.key().0 == user_id)
            .map(|kv| kv.value().clone())
            .collect())
    }

    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let before = self.carts.len();
        self.carts.retain(|(owner, _), _| *owner != user_id);
        Ok(before.saturating_sub(self.carts.len()) as u64)
    }
}

/// Staged checkout writes, applied to the shared maps on commit.
pub struct InMemoryOrderTx {
    orders: Arc<DashMap<Uuid, Order>>,
    pending: Vec<Order>,
    staged_items: Vec<OrderItem>,
}

#[async_trait]
impl OrderTransaction for InMemoryOrderTx {
    async fn create(&mut self, order: Order) -> Result<Order, RepoError> {
        let exists = self.orders.contains_key(&order.id)
            || self.pending.iter().any(|o| o.id == order.id);
        if exists {
            return Err(RepoError::Conflict(format!("order {} exists", order.id)));
        }
        self.pending.push(order.clone());
        Ok(order)
    }

    async fn create_order_items(
        &mut self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, RepoError> {
        let known = self.pending.iter().any(|o| o.id == order_id)
            || self.orders.contains_key(&order_id);
        if !known {
            return Err(RepoError::NotFound);
        }
        let created: Vec<OrderItem> = items
            .into_iter()
            .map(|it| OrderItem::new(order_id, it))
            .collect();
        self.staged_items.extend(created.iter().cloned());
        Ok(created)
    }

    async fn commit(self) -> Result<(), RepoError> {
        let Self {
            orders,
            pending,
            mut staged_items,
        } = self;

        // Pending orders are published whole, items attached before insert.
        for mut order in pending {
            let (mine, rest): (Vec<_>, Vec<_>) = staged_items
                .into_iter()
                .partition(|it| it.order_id == order.id);
            staged_items = rest;
            order.items.extend(mine);
            orders.insert(order.id, order);
        }
        for item in staged_items {
            if let Some(mut order) = orders.get_mut(&item.order_id) {
                order.items.push(item);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    type Tx = InMemoryOrderTx;

    async fn begin(&self) -> Result<Self::Tx, RepoError> {
        Ok(InMemoryOrderTx {
            orders: self.orders.clone(),
            pending: Vec::new(),
            staged_items: Vec::new(),
        })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Order, RepoError> {
        self.orders
            .get(&id)
            .map(|r| r.clone())
            .ok_or(RepoError::NotFound)
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        paging: Paging,
    ) -> Result<Page<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().user_id == user_id)
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = orders.len() as u64;
        let offset = usize::try_from(paging.offset()).unwrap_or(usize::MAX);
        let items = orders
            .into_iter()
            .skip(offset)
            .take(paging.limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepoError> {
        let mut order = self.orders.get_mut(&id).ok_or(RepoError::NotFound)?;
        if order.status != expected {
            return Err(RepoError::Conflict(format!(
                "order {id} is {}, expected {expected}",
                order.status
            )));
        }
        order.update_status(status);
        Ok(order.clone())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Order, RepoError> {
        let mut order = self.orders.get_mut(&id).ok_or(RepoError::NotFound)?;
        if order.payment_status != expected {
            return Err(RepoError::Conflict(format!(
                "order {id} payment is {}, expected {expected}",
                order.payment_status
            )));
        }
        order.update_payment_status(status);
        Ok(order.clone())
    }
}
