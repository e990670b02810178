use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::application::cart_service::CartService;
use crate::application::order_service::OrderService;
use crate::config::Config;
use crate::errors::AppError;
use shop_types::domain::cart::CartItem;
use shop_types::domain::order::{Order, ShippingAddress};
use shop_types::domain::paging::Paging;
use shop_types::domain::ProductId;
use shop_types::ports::cart_repository::CartRepository;
use shop_types::ports::order_repository::OrderRepository;
use shop_types::ports::product_catalog::ProductCatalog;

#[derive(Clone, Debug)]
pub struct HttpServerConfig {
    pub port: String,
    pub request_timeout: Duration,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl HttpServerConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            request_timeout: Duration::from_secs(30),
            default_page_limit: shop_types::domain::paging::DEFAULT_LIMIT,
            max_page_limit: shop_types::domain::paging::MAX_LIMIT,
        }
    }
}

impl From<&Config> for HttpServerConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            port: cfg.server_port.clone(),
            request_timeout: cfg.request_timeout(),
            default_page_limit: cfg.default_page_limit,
            max_page_limit: cfg.max_page_limit,
        }
    }
}

pub struct HttpServer<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    state: AppState<O, C, P>,
    config: HttpServerConfig,
}

struct AppState<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    orders: Arc<OrderService<O, C, P>>,
    carts: Arc<CartService<C, P>>,
    default_page_limit: u32,
    max_page_limit: u32,
}

impl<O, C, P> Clone for AppState<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            carts: self.carts.clone(),
            default_page_limit: self.default_page_limit,
            max_page_limit: self.max_page_limit,
        }
    }
}

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_city: String,
    #[serde(default)]
    pub shipping_country: String,
    #[serde(default)]
    pub shipping_zip: String,
}

impl From<CreateOrderRequest> for ShippingAddress {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            address: req.shipping_address,
            city: req.shipping_city,
            country: req.shipping_country,
            zip: req.shipping_zip,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}

#[derive(Deserialize, Default)]
pub struct ListOrdersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
struct PagingBody {
    page: u32,
    limit: u32,
    total: u64,
}

#[derive(Serialize)]
struct OrdersPage {
    data: Vec<Order>,
    paging: PagingBody,
}

impl<O, C, P> HttpServer<O, C, P>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    pub async fn new(
        orders: OrderService<O, C, P>,
        carts: Arc<CartService<C, P>>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let state = AppState {
            orders: Arc::new(orders),
            carts,
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
        };
        Ok(Self { state, config })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route(
                "/cart/items",
                post(add_cart_item::<O, C, P>)
                    .put(update_cart_item::<O, C, P>)
                    .get(list_cart_items::<O, C, P>),
            )
            .route("/cart/items/{product_id}", delete(remove_cart_item::<O, C, P>))
            .route(
                "/orders",
                post(create_order::<O, C, P>).get(list_orders::<O, C, P>),
            )
            .route("/orders/{id}", get(get_order::<O, C, P>))
            .route("/orders/{id}/status", patch(update_status::<O, C, P>))
            .route(
                "/orders/{id}/payment-status",
                patch(update_payment_status::<O, C, P>),
            )
            .layer(timeout_layer(self.config.request_timeout))
            .layer(trace_layer)
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

/// Stalled requests are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

// Out-of-range query values are clamped rather than rejected.
fn clamp_u32(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn add_cart_item<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartItem>), AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let req = json_body(body)?;
    let line = state
        .carts
        .add_item(user_id, req.product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn update_cart_item<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<Json<CartItem>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let req = json_body(body)?;
    let line = state
        .carts
        .update_quantity(user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(line))
}

async fn remove_cart_item<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let product_id: ProductId = product_id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid product id: {product_id}")))?;
    state.carts.remove_item(user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_cart_items<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<CartItem>>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    Ok(Json(state.carts.get_items(user_id).await?))
}

async fn create_order<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let req = json_body(body)?;
    let order = state.orders.create_order(user_id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrdersPage>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let Query(q) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let paging = Paging::normalized(
        q.page.map(clamp_u32),
        q.limit.map(clamp_u32),
        state.default_page_limit,
        state.max_page_limit,
    );
    let page = state.orders.get_user_orders(user_id, paging).await?;
    Ok(Json(OrdersPage {
        data: page.items,
        paging: PagingBody {
            page: paging.page,
            limit: paging.limit,
            total: page.total,
        },
    }))
}

async fn get_order<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let id = parse_order_id(&id)?;
    Ok(Json(state.orders.get_order(id).await?))
}

async fn update_status<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let id = parse_order_id(&id)?;
    let req = json_body(body)?;
    let updated = state.orders.update_order_status(id, &req.status).await?;
    Ok(Json(updated))
}

async fn update_payment_status<O, C, P>(
    State(state): State<AppState<O, C, P>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdatePaymentStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError>
where
    O: OrderRepository,
    C: CartRepository,
    P: ProductCatalog,
{
    let id = parse_order_id(&id)?;
    let req = json_body(body)?;
    let updated = state
        .orders
        .update_payment_status(id, &req.payment_status)
        .await?;
    Ok(Json(updated))
}
