pub mod auth;
pub mod cart_service;
pub mod inventory;
pub mod order_service;
pub mod payment_service;
pub mod payout_service;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::SessionAuthenticator;
pub use cart_service::CartService;
pub use inventory::InventoryLedger;
pub use order_service::OrderService;
pub use payment_service::{PaymentReceipt, PaymentService};
pub use payout_service::PayoutService;
