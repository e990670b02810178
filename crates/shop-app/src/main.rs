use std::sync::Arc;

use shop_hex::application::cart_service::CartService;
use shop_hex::application::order_service::OrderService;
use shop_hex::config::Config;
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!(backend = repo.backend(), "repository ready");

    let carts = Arc::new(CartService::new(repo.clone(), repo.clone()));
    let orders = OrderService::new(repo, carts.clone());

    let http = HttpServer::new(orders, carts, HttpServerConfig::from(&config)).await?;
    http.run().await
}
