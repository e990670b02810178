#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use async_trait::async_trait;
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
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://shop.db";

/// Backend picked at startup. One value serves as cart store, order store
/// and product catalog.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteStore),
}

pub enum RepoTx {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryOrderTx),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteOrderTx),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryStore::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        Ok(Self::Sqlite(sqlite::SqliteStore::new(url).await?))
    }

    // Both backends compiled in: an explicit URL selects SQLite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(sqlite::SqliteStore::new(url).await?)),
            None => Ok(Self::Memory(memory::InMemoryStore::new())),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "sqlite",
        }
    }

    /// Seed a catalog entry on whichever backend is active.
    pub async fn insert_product(&self, product: Product) -> Result<(), RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => {
                m.insert_product(product);
                Ok(())
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.insert_product(&product).await,
        }
    }
}

#[async_trait]
impl ProductCatalog for Repo {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.get_product(id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.get_product(id).await,
        }
    }
}

#[async_trait]
impl CartRepository for Repo {
    async fn create(&self, item: CartItem) -> Result<CartItem, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => CartRepository::create(m, item).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => CartRepository::create(s, item).await,
        }
    }

    async fn update(&self, item: CartItem) -> Result<CartItem, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.update(item).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.update(item).await,
        }
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.delete(user_id, product_id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.delete(user_id, product_id).await,
        }
    }

    async fn get_by_user_and_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.get_by_user_and_product(user_id, product_id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.get_by_user_and_product(user_id, product_id).await,
        }
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.get_by_user(user_id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.get_by_user(user_id).await,
        }
    }

    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.delete_all_by_user(user_id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.delete_all_by_user(user_id).await,
        }
    }
}

#[async_trait]
impl OrderTransaction for RepoTx {
    async fn create(&mut self, order: Order) -> Result<Order, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(tx) => tx.create(order).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => tx.create(order).await,
        }
    }

    async fn create_order_items(
        &mut self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(tx) => tx.create_order_items(order_id, items).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => tx.create_order_items(order_id, items).await,
        }
    }

    async fn commit(self) -> Result<(), RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(tx) => tx.commit().await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(tx) => tx.commit().await,
        }
    }
}

#[async_trait]
impl OrderRepository for Repo {
    type Tx = RepoTx;

    async fn begin(&self) -> Result<Self::Tx, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => Ok(RepoTx::Memory(m.begin().await?)),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => Ok(RepoTx::Sqlite(s.begin().await?)),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Order, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.get_by_id(id).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.get_by_id(id).await,
        }
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        paging: Paging,
    ) -> Result<Page<Order>, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.get_by_user_id(user_id, paging).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.get_by_user_id(user_id, paging).await,
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.update_status(id, expected, status).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.update_status(id, expected, status).await,
        }
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Order, RepoError> {
        match self {
            #[cfg(feature = "memory")]
            Self::Memory(m) => m.update_payment_status(id, expected, status).await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(s) => s.update_payment_status(id, expected, status).await,
        }
    }
}
