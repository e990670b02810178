#![cfg(feature = "sqlite")]

use rust_decimal::Decimal;
use shop_repo::{build_repo, Repo};
use shop_types::domain::paging::Paging;
use shop_types::domain::product::Product;
use shop_types::ports::order_repository::OrderRepository;
use shop_types::ports::product_catalog::ProductCatalog;

#[tokio::test]
async fn builds_sqlite_repo_from_url() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("shop-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repo: Repo = build_repo(Some(&url)).await.expect("build repo");
    assert_eq!(repo.backend(), "sqlite");
    assert!(db_path.exists());

    let page = repo
        .get_by_user_id(1, Paging::default())
        .await
        .expect("list");
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);

    repo.insert_product(Product {
        id: 1,
        name: "Widget".into(),
        price: Decimal::new(1099, 2),
    })
    .await
    .unwrap();
    let found = repo.get_product(1).await.unwrap().unwrap();
    assert_eq!(found.price, Decimal::new(1099, 2));
}

#[tokio::test]
async fn reopening_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("shop.db").display());

    let first = build_repo(Some(&url)).await.unwrap();
    first
        .insert_product(Product {
            id: 2,
            name: "Gadget".into(),
            price: Decimal::new(2099, 2),
        })
        .await
        .unwrap();
    drop(first);

    let second = build_repo(Some(&url)).await.unwrap();
    assert!(second.get_product(2).await.unwrap().is_some());
}
