use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    Paypal,
}

impl PaymentProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Paypal => "paypal",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProvider::Stripe),
            "paypal" => Ok(PaymentProvider::Paypal),
            other => Err(DomainError::Persistence(format!(
                "unknown payment provider '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: PaymentProvider,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn is_refundable(self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::PartiallyRefunded
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "refunded" => Ok(PaymentStatus::Refunded),
            "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
            other => Err(DomainError::Persistence(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    /// Negative for refunds.
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub provider_response: Value,
    pub parent_payment_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_refund(&self) -> bool {
        self.parent_payment_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub provider_response: Value,
    pub parent_payment_id: Option<Uuid>,
    pub reason: Option<String>,
}

/// Refunds that count against the original: settled ones and those still in flight.
fn holds_refund_amount(refund: &Payment) -> bool {
    matches!(
        refund.status,
        PaymentStatus::Processing | PaymentStatus::Completed
    )
}

/// What can still be refunded of `original` given its child refunds.
pub fn refundable_remaining(original: &BigDecimal, refunds: &[Payment]) -> BigDecimal {
    refunds
        .iter()
        .filter(|r| holds_refund_amount(r))
        .fold(original.clone(), |left, r| left - r.amount.abs())
}

/// Sum of the completed refunds, as a positive amount.
pub fn completed_refund_total(refunds: &[Payment]) -> BigDecimal {
    refunds
        .iter()
        .filter(|r| r.status == PaymentStatus::Completed)
        .fold(BigDecimal::from(0), |total, r| total + r.amount.abs())
}

/// Status of the original payment once `refunded_total` has gone back.
pub fn status_after_refund(original: &BigDecimal, refunded_total: &BigDecimal) -> PaymentStatus {
    if refunded_total >= original {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::PartiallyRefunded
    }
}

// ── Gateway contract ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: GatewayStatus,
    pub transaction_id: String,
    pub raw_response: Value,
}

/// The gateway's verdict, as stored on a claimed payment row.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub provider_response: Value,
}

impl From<GatewayResponse> for Settlement {
    fn from(r: GatewayResponse) -> Self {
        Settlement {
            status: match r.status {
                GatewayStatus::Completed => PaymentStatus::Completed,
                GatewayStatus::Failed => PaymentStatus::Failed,
            },
            transaction_id: r.transaction_id,
            provider_response: r.raw_response,
        }
    }
}

/// A settled charge; `order_updated` is false when the order had already
/// left `pending` by the time the verdict arrived.
#[derive(Debug, Clone)]
pub struct SettledCharge {
    pub payment: Payment,
    pub order_updated: bool,
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub provider: PaymentProvider,
    pub original_transaction_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
}

/// The provider could not be reached or answered garbage; nothing was charged.
#[derive(Debug, Clone, Error)]
#[error("{provider} gateway unavailable: {message}")]
pub struct GatewayError {
    pub provider: &'static str,
    pub message: String,
}

impl From<GatewayError> for DomainError {
    fn from(e: GatewayError) -> Self {
        DomainError::Gateway(e.to_string())
    }
}
