use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::catalog::StockLevel;
use super::errors::DomainError;
use super::payment::PaymentStatus;
use super::pricing::{PriceBreakdown, ShippingZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    PaymentFailed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Pending, PaymentFailed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses in which the order's items hold inventory reservations.
    pub fn holds_reservation(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// What moving from `self` to `next` does to the reserved stock.
    pub fn stock_effect(self, next: OrderStatus) -> StockEffect {
        if !self.holds_reservation() || next.holds_reservation() {
            StockEffect::Keep
        } else if next == OrderStatus::Shipped {
            StockEffect::Consume
        } else {
            StockEffect::Release
        }
    }
}

/// Applied to every item of an order, in the same transaction as its status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    Keep,
    /// Reserved units go back to available.
    Release,
    /// Reserved units leave the warehouse.
    Consume,
}

impl StockEffect {
    pub fn apply(self, level: StockLevel, quantity: i32) -> StockLevel {
        match self {
            StockEffect::Keep => level,
            StockEffect::Release => level.released_by(quantity),
            StockEffect::Consume => level.consumed_by(quantity),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "payment_failed" => Ok(OrderStatus::PaymentFailed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl OrderPaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "pending",
            OrderPaymentStatus::Paid => "paid",
            OrderPaymentStatus::Failed => "failed",
            OrderPaymentStatus::Refunded => "refunded",
            OrderPaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// The order-level status matching its payment's status after a refund.
    pub fn after_refund(payment: PaymentStatus) -> Self {
        match payment {
            PaymentStatus::Refunded => OrderPaymentStatus::Refunded,
            _ => OrderPaymentStatus::PartiallyRefunded,
        }
    }
}

impl fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderPaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderPaymentStatus::Pending),
            "paid" => Ok(OrderPaymentStatus::Paid),
            "failed" => Ok(OrderPaymentStatus::Failed),
            "refunded" => Ok(OrderPaymentStatus::Refunded),
            "partially_refunded" => Ok(OrderPaymentStatus::PartiallyRefunded),
            other => Err(DomainError::Persistence(format!(
                "unknown order payment status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Everything the caller supplies at checkout. Prices are never part of it.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub discount_amount: BigDecimal,
    pub shipping_zone: ShippingZone,
}

/// Checkout of the caller's own cart; the items come from the cart itself.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub shipping_zone: ShippingZone,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub product_snapshot: Value,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub totals: PriceBreakdown,
    pub currency: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub product_snapshot: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub shipping_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    pub fn item_inputs(&self) -> Vec<OrderItemInput> {
        self.items
            .iter()
            .map(|i| OrderItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect()
    }
}

/// A status change as the store should apply it, guarded by `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub tracking_number: Option<String>,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// The order-side effect of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
}

impl PaymentOutcome {
    pub fn paid() -> Self {
        Self {
            status: OrderStatus::Processing,
            payment_status: OrderPaymentStatus::Paid,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: OrderStatus::PaymentFailed,
            payment_status: OrderPaymentStatus::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}
