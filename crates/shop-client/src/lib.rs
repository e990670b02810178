use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use shop_types::domain::cart::CartItem;
use shop_types::domain::order::Order;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::domain::{ProductId, UserId};
use uuid::Uuid;

/// Header carrying the caller identity.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct ShopClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct ShopClient {
    base: Url,
    client: reqwest::Client,
}

impl ShopClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<ShopClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(ShopClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn add_cart_item(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> anyhow::Result<CartItem> {
        let res = self
            .client
            .post(self.url("cart/items")?)
            .json(&CartItemRequest {
                product_id,
                quantity,
            })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update_cart_item(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> anyhow::Result<CartItem> {
        let res = self
            .client
            .put(self.url("cart/items")?)
            .json(&CartItemRequest {
                product_id,
                quantity,
            })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn remove_cart_item(&self, product_id: ProductId) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(self.url(&format!("cart/items/{product_id}"))?)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    pub async fn list_cart_items(&self) -> anyhow::Result<Vec<CartItem>> {
        let res = self.client.get(self.url("cart/items")?).send().await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn create_order(&self, req: CreateOrderRequest) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(&req)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn get_order(&self, id: Uuid) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn list_orders(&self, page: u32, limit: u32) -> anyhow::Result<OrdersPage> {
        let res = self
            .client
            .get(self.url("orders")?)
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&format!("orders/{id}/status"))?)
            .json(&UpdateStatusRequest { status })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&format!("orders/{id}/payment-status"))?)
            .json(&UpdatePaymentStatusRequest { payment_status })
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }
}

/// Turns a non-2xx reply into an error carrying the server's message.
async fn check(res: Response) -> anyhow::Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let msg = match res.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => String::from("no error body"),
    };
    tracing::debug!(%status, %msg, "shop api error");
    Err(ApiError { status, msg }.into())
}

/// Non-2xx reply from the shop API.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {msg}")]
pub struct ApiError {
    pub status: reqwest::StatusCode,
    pub msg: String,
}

impl ShopClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sends `x-user-id` on every request.
    pub fn with_user_id(self, user_id: UserId) -> anyhow::Result<Self> {
        self.with_header(USER_ID_HEADER, user_id.to_string())
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ShopClient> {
        if let Some(client) = self.client {
            return Ok(ShopClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ShopClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_country: String,
    pub shipping_zip: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrdersPage {
    pub data: Vec<Order>,
    pub paging: PageInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdatePaymentStatusRequest {
    payment_status: PaymentStatus,
}

#[derive(Serialize, Deserialize, Debug)]
struct ErrorBody {
    error: String,
}
