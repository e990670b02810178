use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use shop_types::domain::cart::CartItem;
use shop_types::domain::order::{NewOrderItem, Order, OrderItem, ShippingAddress};
use shop_types::domain::paging::{Page, Paging};
use shop_types::domain::product::Product;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::domain::{ProductId, UserId};
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::order_repository::{OrderRepository, OrderTransaction};
use shop_types::ports::product_catalog::ProductCatalog;
use shop_types::ports::RepoError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, total_amount, shipping_address, \
     shipping_city, shipping_country, shipping_zip, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, product_id, quantity, price, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::DbError(e.to_string()),
    }
}

fn decode_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(decode_err)?
        .with_timezone(&Utc))
}

fn parse_decimal(raw: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(raw).map_err(decode_err)
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: i64,
    status: String,
    payment_status: String,
    total_amount: String,
    shipping_address: String,
    shipping_city: String,
    shipping_country: String,
    shipping_zip: String,
    created_at: String,
    updated_at: String,
}

impl DbOrder {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepoError> {
        Ok(Order {
            id: Uuid::parse_str(&self.id).map_err(decode_err)?,
            user_id: self.user_id,
            status: self.status.parse::<OrderStatus>().map_err(decode_err)?,
            payment_status: self
                .payment_status
                .parse::<PaymentStatus>()
                .map_err(decode_err)?,
            total_amount: parse_decimal(&self.total_amount)?,
            shipping: ShippingAddress {
                address: self.shipping_address,
                city: self.shipping_city,
                country: self.shipping_country,
                zip: self.shipping_zip,
            },
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            items,
        })
    }
}

#[derive(FromRow)]
struct DbOrderItem {
    id: String,
    order_id: String,
    product_id: i64,
    quantity: i32,
    price: String,
    created_at: String,
    updated_at: String,
}

impl DbOrderItem {
    fn into_item(self) -> Result<OrderItem, RepoError> {
        Ok(OrderItem {
            id: Uuid::parse_str(&self.id).map_err(decode_err)?,
            order_id: Uuid::parse_str(&self.order_id).map_err(decode_err)?,
            product_id: self.product_id,
            quantity: self.quantity,
            price: parse_decimal(&self.price)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbCartItem {
    id: String,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    price: String,
    created_at: String,
    updated_at: String,
}

impl DbCartItem {
    fn into_item(self) -> Result<CartItem, RepoError> {
        Ok(CartItem {
            id: Uuid::parse_str(&self.id).map_err(decode_err)?,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            price: parse_decimal(&self.price)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbProduct {
    id: i64,
    name: String,
    price: String,
}

async fn load_items(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> Result<Vec<OrderItem>, RepoError> {
    let rows: Vec<DbOrderItem> = sqlx::query_as(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await
    .map_err(db_err)?;
    rows.into_iter().map(DbOrderItem::into_item).collect()
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_shop.sql");
        for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Seed or reprice a catalog entry.
    pub async fn insert_product(&self, product: &Product) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO products (id, name, price) VALUES (?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, price = excluded.price",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Order, RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await
                .map_err(db_err)?;
        let row = row.ok_or(RepoError::NotFound)?;
        let items = load_items(&mut conn, &row.id).await?;
        row.into_order(items)
    }

    /// Tells a lost race apart from a missing row after a guarded update
    /// matched nothing.
    async fn guard_failure(&self, id: Uuid, column: &str) -> RepoError {
        let current: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar(&format!("SELECT {column} FROM orders WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await;
        match current {
            Ok(Some(value)) => RepoError::Conflict(format!("order {id} {column} is {value}")),
            Ok(None) => RepoError::NotFound,
            Err(e) => db_err(e),
        }
    }
}

#[async_trait]
impl ProductCatalog for SqliteStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        let row: Option<DbProduct> =
            sqlx::query_as("SELECT id, name, price FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(|r| {
            Ok(Product {
                id: r.id,
                name: r.name,
                price: parse_decimal(&r.price)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl CartRepository for SqliteStore {
    async fn create(&self, item: CartItem) -> Result<CartItem, RepoError> {
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, price, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.user_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price.to_string())
        .bind(ts(&item.created_at))
        .bind(ts(&item.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(item)
    }

    async fn update(&self, item: CartItem) -> Result<CartItem, RepoError> {
        let res = sqlx::query(
            "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE user_id = ? AND product_id = ?",
        )
        .bind(item.quantity)
        .bind(ts(&item.updated_at))
        .bind(item.user_id)
        .bind(item.product_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(item)
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_by_user_and_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepoError> {
        let row: Option<DbCartItem> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = ? AND product_id = ?"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbCartItem::into_item).transpose()
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepoError> {
        let rows: Vec<DbCartItem> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = ? ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbCartItem::into_item).collect()
    }

    async fn delete_all_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected())
    }
}

/// Checkout writes on one SQLite transaction. sqlx rolls the transaction
/// back when it is dropped uncommitted.
pub struct SqliteOrderTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl OrderTransaction for SqliteOrderTx {
    async fn create(&mut self, order: Order) -> Result<Order, RepoError> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(order.id.to_string())
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.total_amount.to_string())
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.country)
        .bind(&order.shipping.zip)
        .bind(ts(&order.created_at))
        .bind(ts(&order.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(order)
    }

    async fn create_order_items(
        &mut self,
        order_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, RepoError> {
        let mut created = Vec::with_capacity(items.len());
        for new_item in items {
            let item = OrderItem::new(order_id, new_item);
            sqlx::query(&format!(
                "INSERT INTO order_items ({ORDER_ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(item.id.to_string())
            .bind(item.order_id.to_string())
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price.to_string())
            .bind(ts(&item.created_at))
            .bind(ts(&item.updated_at))
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
            created.push(item);
        }
        Ok(created)
    }

    async fn commit(self) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(db_err)
    }
}

#[async_trait]
impl OrderRepository for SqliteStore {
    type Tx = SqliteOrderTx;

    async fn begin(&self) -> Result<Self::Tx, RepoError> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(SqliteOrderTx { tx })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Order, RepoError> {
        self.order_by_id(id).await
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
        paging: Paging,
    ) -> Result<Page<Order>, RepoError> {
        let offset = i64::try_from(paging.offset()).map_err(decode_err)?;
        // Count and page read the same snapshot.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(i64::from(paging.limit))
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items(&mut tx, &row.id).await?;
            orders.push(row.into_order(items)?);
        }
        tx.commit().await.map_err(db_err)?;

        Ok(Page {
            items: orders,
            total: u64::try_from(total).map_err(decode_err)?,
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Order, RepoError> {
        let res = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(ts(&Utc::now()))
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(self.guard_failure(id, "status").await);
        }
        self.order_by_id(id).await
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Order, RepoError> {
        let res = sqlx::query(
            "UPDATE orders SET payment_status = ?, updated_at = ? WHERE id = ? AND payment_status = ?",
        )
        .bind(status.as_str())
        .bind(ts(&Utc::now()))
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(self.guard_failure(id, "payment_status").await);
        }
        self.order_by_id(id).await
    }
}
