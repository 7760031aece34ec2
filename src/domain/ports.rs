use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::CartItem;
use super::catalog::{Product, StockLevel};
use super::errors::DomainError;
use super::identity::Actor;
use super::order::{ListResult, NewOrder, OrderView, PaymentOutcome, StatusChange};
use super::payment::{
    ChargeRequest, GatewayError, GatewayResponse, NewPayment, Payment, PaymentMethod,
    RefundRequest, SettledCharge, Settlement,
};
use super::payout::{PayoutShare, VendorPayout};

pub trait CatalogRepository: Send + Sync + 'static {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Missing ids are skipped, not reported.
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
}

/// Single-row atomic stock updates.
pub trait InventoryRepository: Send + Sync + 'static {
    fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, DomainError>;
    /// Moves `quantity` from available to reserved only if enough is available.
    /// `None` means the row is missing or short; nothing was changed.
    fn try_reserve(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<StockLevel>, DomainError>;
    /// Moves up to `quantity` from reserved back to available.
    fn release(&self, product_id: Uuid, quantity: i32)
        -> Result<Option<StockLevel>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn items_for(&self, customer_id: Uuid) -> Result<Vec<CartItem>, DomainError>;
    fn find_item(&self, item_id: Uuid) -> Result<Option<CartItem>, DomainError>;
    /// Inserts the line or atomically increments the existing one.
    fn add(&self, customer_id: Uuid, product_id: Uuid, quantity: i32)
        -> Result<CartItem, DomainError>;
    fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>, DomainError>;
    fn remove(&self, item_id: Uuid) -> Result<bool, DomainError>;
    fn clear(&self, customer_id: Uuid) -> Result<usize, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists the order and all of its items in one transaction.
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError>;
    /// Compensation for a checkout that could not complete.
    fn discard(&self, order_id: Uuid) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(
        &self,
        customer_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError>;
    /// Applies `change` only while the order is still in `change.from`, and
    /// with it `change.from.stock_effect(change.to)` on every item's product.
    /// `None` means the guard did not match and nothing changed.
    fn update_status(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<OrderView>, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn find_method(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError>;
    fn refunds_of(&self, payment_id: Uuid) -> Result<Vec<Payment>, DomainError>;
    /// Claims a pending order for one charge by storing `payment` as
    /// `processing`. Fails with `InvalidTransition` when the order is not
    /// pending or another charge already holds it.
    fn begin_charge(&self, payment: NewPayment) -> Result<Payment, DomainError>;
    /// Stores the gateway verdict on a claimed charge and, if the order is
    /// still pending, moves it to `outcome` (applying its stock effect) in the
    /// same transaction.
    fn settle_charge(
        &self,
        payment_id: Uuid,
        settlement: Settlement,
        outcome: PaymentOutcome,
    ) -> Result<SettledCharge, DomainError>;
    /// Reserves a refund against its parent payment by storing it as
    /// `processing`. Fails with `InvalidInput` when it would take the refunds
    /// past the original amount.
    fn begin_refund(&self, refund: NewPayment) -> Result<Payment, DomainError>;
    /// Stores the verdict on a reserved refund. A completed refund moves the
    /// original payment and its order to refunded or partially refunded.
    fn settle_refund(&self, refund_id: Uuid, settlement: Settlement)
        -> Result<Payment, DomainError>;
    /// Drops a claim whose gateway call never got an answer.
    fn abandon(&self, payment_id: Uuid) -> Result<(), DomainError>;
}

pub trait PayoutRepository: Send + Sync + 'static {
    /// Idempotent per `(vendor_id, order_id)`; returns every payout of the order.
    fn insert_for_order(
        &self,
        order_id: Uuid,
        shares: &[PayoutShare],
    ) -> Result<Vec<VendorPayout>, DomainError>;
    fn list_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<VendorPayout>, DomainError>;
}

pub trait SessionRepository: Send + Sync + 'static {
    fn find_active(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<Actor>, DomainError>;
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn charge(&self, request: &ChargeRequest) -> Result<GatewayResponse, GatewayError>;
    fn refund(&self, request: &RefundRequest) -> Result<GatewayResponse, GatewayError>;
}
