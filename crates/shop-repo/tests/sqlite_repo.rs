#![cfg(feature = "sqlite")]

use rust_decimal::Decimal;
use shop_repo::sqlite::SqliteStore;
use shop_types::domain::cart::CartItem;
use shop_types::domain::order::{NewOrderItem, Order, ShippingAddress};
use shop_types::domain::paging::Paging;
use shop_types::domain::product::Product;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::order_repository::{OrderRepository, OrderTransaction};
use shop_types::ports::product_catalog::ProductCatalog;
use shop_types::ports::RepoError;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_db_url() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut path = PathBuf::from(dir.path());
    path.push(format!("shop-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    (dir, url)
}

fn shipping() -> ShippingAddress {
    ShippingAddress {
        address: "123 Test St".into(),
        city: "Test City".into(),
        country: "Test Country".into(),
        zip: "12345".into(),
    }
}

fn line(product_id: i64, quantity: i32, cents: i64) -> NewOrderItem {
    NewOrderItem {
        product_id,
        quantity,
        price: Decimal::new(cents, 2),
    }
}

#[tokio::test]
async fn sqlite_cart_crud_flow() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let item = CartItem::new(1, 10, 2, Decimal::new(1099, 2));

    repo.create(item.clone()).await.unwrap();
    let dup = repo.create(CartItem::new(1, 10, 1, Decimal::ONE)).await;
    assert!(matches!(dup, Err(RepoError::Conflict(_))));

    let mut fetched = repo.get_by_user_and_product(1, 10).await.unwrap().unwrap();
    assert_eq!(fetched.id, item.id);
    assert_eq!(fetched.price, Decimal::new(1099, 2));

    fetched.set_quantity(5);
    repo.update(fetched).await.unwrap();
    let reread = repo.get_by_user_and_product(1, 10).await.unwrap().unwrap();
    assert_eq!(reread.quantity, 5);

    repo.create(CartItem::new(1, 11, 1, Decimal::ONE)).await.unwrap();
    repo.create(CartItem::new(2, 10, 1, Decimal::ONE)).await.unwrap();
    assert_eq!(repo.get_by_user(1).await.unwrap().len(), 2);

    assert!(repo.delete(1, 11).await.unwrap());
    assert!(!repo.delete(1, 11).await.unwrap());

    assert_eq!(repo.delete_all_by_user(1).await.unwrap(), 1);
    assert!(repo.get_by_user(1).await.unwrap().is_empty());
    assert_eq!(repo.get_by_user(2).await.unwrap().len(), 1);

    let missing = repo.update(CartItem::new(9, 9, 1, Decimal::ONE)).await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn sqlite_catalog_upsert_and_lookup() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let mut product = Product {
        id: 1,
        name: "Widget".into(),
        price: Decimal::new(1099, 2),
    };
    repo.insert_product(&product).await.unwrap();
    product.price = Decimal::new(1299, 2);
    repo.insert_product(&product).await.unwrap();

    let found = repo.get_product(1).await.unwrap().unwrap();
    assert_eq!(found.price, Decimal::new(1299, 2));
    assert!(repo.get_product(2).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_order_tx_commit_and_reload() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let order = Order::new(1, shipping(), Decimal::new(4297, 2));

    let mut tx = repo.begin().await.unwrap();
    tx.create(order.clone()).await.unwrap();
    tx.create_order_items(order.id, vec![line(1, 2, 1099), line(2, 1, 2099)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let fetched = repo.get_by_id(order.id).await.unwrap();
    assert_eq!(fetched.user_id, 1);
    assert_eq!(fetched.status, OrderStatus::Pending);
    assert_eq!(fetched.payment_status, PaymentStatus::Pending);
    assert_eq!(fetched.total_amount, Decimal::new(4297, 2));
    assert_eq!(fetched.shipping, shipping());
    assert_eq!(fetched.items.len(), 2);
    assert_eq!(fetched.items_total(), Some(fetched.total_amount));
}

#[tokio::test]
async fn sqlite_order_tx_drop_rolls_back() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let order = Order::new(1, shipping(), Decimal::ONE);
    {
        let mut tx = repo.begin().await.unwrap();
        tx.create(order.clone()).await.unwrap();
        tx.create_order_items(order.id, vec![line(1, 1, 100)])
            .await
            .unwrap();
    }
    assert!(matches!(
        repo.get_by_id(order.id).await,
        Err(RepoError::NotFound)
    ));
    let page = repo.get_by_user_id(1, Paging::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn sqlite_failed_item_insert_leaves_nothing_behind() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let order = Order::new(1, shipping(), Decimal::ONE);
    {
        let mut tx = repo.begin().await.unwrap();
        tx.create(order.clone()).await.unwrap();
        // Second line breaks the quantity CHECK after the first was written.
        let res = tx
            .create_order_items(order.id, vec![line(1, 1, 100), line(2, 0, 100)])
            .await;
        assert!(res.is_err());
    }

    assert!(matches!(
        repo.get_by_id(order.id).await,
        Err(RepoError::NotFound)
    ));
    let page = repo.get_by_user_id(1, Paging::default()).await.unwrap();
    assert_eq!(page.total, 0);

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE order_id = ?")
        .bind(order.id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn sqlite_order_items_need_known_order() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let mut tx = repo.begin().await.unwrap();
    let res = tx
        .create_order_items(Uuid::new_v4(), vec![line(1, 1, 100)])
        .await;
    assert!(res.is_err());
}

#[tokio::test]
async fn sqlite_orders_page_newest_first() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = Order::new(1, shipping(), Decimal::ONE);
        ids.push(order.id);
        let mut tx = repo.begin().await.unwrap();
        tx.create(order).await.unwrap();
        tx.commit().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first = repo.get_by_user_id(1, Paging::new(1, 2)).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(
        first.items.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );

    let second = repo.get_by_user_id(1, Paging::new(2, 2)).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, ids[0]);

    let none = repo.get_by_user_id(2, Paging::default()).await.unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn sqlite_guarded_status_updates() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteStore::new(&url).await.unwrap();
    let order = Order::new(1, shipping(), Decimal::ONE);
    let mut tx = repo.begin().await.unwrap();
    tx.create(order.clone()).await.unwrap();
    tx.commit().await.unwrap();

    let confirmed = repo
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);

    let stale = repo
        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
        .await;
    assert!(matches!(stale, Err(RepoError::Conflict(_))));

    let paid = repo
        .update_payment_status(order.id, PaymentStatus::Pending, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let missing = repo
        .update_payment_status(Uuid::new_v4(), PaymentStatus::Pending, PaymentStatus::Paid)
        .await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}
