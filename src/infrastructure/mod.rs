pub mod cart_repo;
pub mod gateway;
pub mod models;
pub mod order_repo;
pub mod outbox;
pub mod payment_repo;
pub mod payout_repo;
pub mod product_repo;
pub mod session_repo;

#[cfg(test)]
pub(crate) mod test_support;

pub use cart_repo::DieselCartRepository;
pub use gateway::{GatewaySettings, SimulatedGateway};
pub use order_repo::DieselOrderRepository;
pub use payment_repo::DieselPaymentRepository;
pub use payout_repo::DieselPayoutRepository;
pub use product_repo::DieselProductRepository;
pub use session_repo::DieselSessionRepository;

use crate::domain::errors::DomainError;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}
