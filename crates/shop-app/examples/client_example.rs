///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use rust_decimal::Decimal;
use shop_client::{CreateOrderRequest, ShopClient};
use shop_hex::application::cart_service::CartService;
use shop_hex::application::order_service::OrderService;
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::build_repo;
use shop_types::domain::product::Product;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use tempfile::tempdir;

fn find_free_port() -> anyhow::Result<u16> {
    Ok(std::net::TcpListener::bind("127.0.0.1:0")?
        .local_addr()?
        .port())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port()?;
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}", tmp.path().join("shop.db").display());

    let repo = build_repo(Some(&db_url)).await?;
    repo.insert_product(Product {
        id: 1,
        name: "Widget".into(),
        price: Decimal::new(1099, 2),
    })
    .await?;
    repo.insert_product(Product {
        id: 2,
        name: "Gadget".into(),
        price: Decimal::new(2099, 2),
    })
    .await?;

    let carts = Arc::new(CartService::new(repo.clone(), repo.clone()));
    let orders = OrderService::new(repo, carts.clone());
    let server = HttpServer::new(orders, carts, HttpServerConfig::new(port.to_string())).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            eprintln!("server stopped: {e:#}");
        }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = ShopClient::builder(&addr)?.with_user_id(1)?.build()?;
    client.add_cart_item(1, 2).await?;
    client.add_cart_item(2, 1).await?;
    println!("Cart has {} lines", client.list_cart_items().await?.len());

    let order = client
        .create_order(CreateOrderRequest {
            shipping_address: "123 Test St".into(),
            shipping_city: "Test City".into(),
            shipping_country: "Test Country".into(),
            shipping_zip: "12345".into(),
        })
        .await?;
    println!("Created order id={} total={}", order.id, order.total_amount);
    assert_eq!(order.total_amount, Decimal::new(4297, 2));
    assert!(client.list_cart_items().await?.is_empty());

    let confirmed = client.update_status(order.id, OrderStatus::Confirmed).await?;
    println!("Order status={}", confirmed.status);
    let paid = client
        .update_payment_status(order.id, PaymentStatus::Paid)
        .await?;
    println!("Payment status={}", paid.payment_status);

    match client.update_status(order.id, OrderStatus::Delivered).await {
        Ok(_) => anyhow::bail!("skipping states should be rejected"),
        Err(err) => println!("Rejected as expected: {err}"),
    }

    let page = client.list_orders(1, 10).await?;
    println!("User has {} order(s)", page.paging.total);

    handle.abort();
    Ok(())
}
