use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shop_types::domain::status::{OrderStatus, PaymentStatus};
use shop_types::domain::ProductId;
use shop_types::ports::RepoError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("adding {added} to quantity {current} overflows")]
    QuantityOverflow { current: i32, added: i32 },

    #[error("invalid shipping address: {0} is required")]
    InvalidShippingAddress(&'static str),

    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),

    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("cannot move payment from {from} to {to}")]
    InvalidPaymentStatusTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("cart item not found for product {0}")]
    CartItemNotFound(ProductId),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("cart is empty")]
    CartEmpty,

    #[error("order total out of range")]
    TotalOverflow,

    #[error("cannot create order")]
    CannotCreateOrder(#[source] RepoError),

    #[error("cannot create order items")]
    CannotCreateOrderItems(#[source] RepoError),

    #[error("cannot update order")]
    CannotUpdateOrder(#[source] RepoError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("missing or invalid user identity")]
    Unauthorized,

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::Internal(anyhow::Error::new(e))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidQuantity(_)
            | AppError::QuantityOverflow { .. }
            | AppError::InvalidShippingAddress(_)
            | AppError::InvalidOrderStatus(_)
            | AppError::InvalidPaymentStatus(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidStatusTransition { .. }
            | AppError::InvalidPaymentStatusTransition { .. } => StatusCode::CONFLICT,
            AppError::OrderNotFound(_)
            | AppError::CartItemNotFound(_)
            | AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CartEmpty | AppError::TotalOverflow => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::CannotCreateOrder(_)
            | AppError::CannotCreateOrderItems(_)
            | AppError::CannotUpdateOrder(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        // Store errors stay in the log only.
        let msg = if code.is_server_error() {
            match &self {
                AppError::Internal(e) => tracing::error!(error = ?e, "internal error"),
                other => tracing::error!(
                    error = %other,
                    source = ?std::error::Error::source(other),
                    "persistence failure"
                ),
            }
            match self {
                AppError::Internal(_) => "internal error".to_string(),
                other => other.to_string(),
            }
        } else {
            self.to_string()
        };

        let body = serde_json::to_string(&ErrorBody { error: msg })
            .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}
