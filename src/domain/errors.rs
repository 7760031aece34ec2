use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    #[error("Missing or expired session")]
    Unauthenticated,
    #[error("Not permitted for this customer")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Payment declined for order {order_id}")]
    PaymentDeclined { order_id: Uuid },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        DomainError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
