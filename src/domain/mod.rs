pub mod cart;
pub mod catalog;
pub mod errors;
pub mod identity;
pub mod order;
pub mod payment;
pub mod payout;
pub mod ports;
pub mod pricing;
