use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::PaymentReceipt;
use crate::domain::payment::Payment;
use crate::errors::AppError;
use crate::state::AppState;

use super::auth::Authenticated;
use super::orders::{parse_money, OrderResponse};
use super::payouts::PayoutResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    pub payment_method_id: Uuid,
    /// Must equal the order total when given, e.g. "108.00".
    pub amount: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefundRequestBody {
    /// Defaults to everything not yet refunded.
    pub amount: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    /// Negative for refunds.
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    #[schema(value_type = Object)]
    pub provider_response: serde_json::Value,
    pub parent_payment_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        PaymentResponse {
            id: p.id,
            order_id: p.order_id,
            user_id: p.user_id,
            payment_method_id: p.payment_method_id,
            amount: p.amount.to_string(),
            currency: p.currency,
            status: p.status.to_string(),
            transaction_id: p.transaction_id,
            provider_response: p.provider_response,
            parent_payment_id: p.parent_payment_id,
            reason: p.reason,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReceiptResponse {
    pub payment: PaymentResponse,
    pub order: OrderResponse,
    pub payouts: Vec<PayoutResponse>,
    /// True when the charge stands but payouts must be rerun by an admin.
    pub payouts_pending: bool,
}

impl From<PaymentReceipt> for PaymentReceiptResponse {
    fn from(r: PaymentReceipt) -> Self {
        PaymentReceiptResponse {
            payment: r.payment.into(),
            order: r.order.into(),
            payouts: r.payouts.into_iter().map(PayoutResponse::from).collect(),
            payouts_pending: r.payouts_pending,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/{id}/payments
///
/// Charges a pending order. A decline releases its stock, puts its items
/// back in the cart and answers 402.
#[utoipa::path(
    post,
    path = "/orders/{id}/payments",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = ProcessPaymentRequest,
    responses(
        (status = 201, description = "Payment captured", body = PaymentReceiptResponse),
        (status = 400, description = "Amount does not match the order total"),
        (status = 402, description = "Payment declined"),
        (status = 404, description = "Order or payment method not found"),
        (status = 409, description = "Order is not awaiting payment"),
        (status = 502, description = "Payment provider unreachable"),
    ),
    security(("bearer" = [])),
    tag = "payments"
)]
pub async fn process_payment(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ProcessPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let amount = body
        .amount
        .as_deref()
        .map(|raw| parse_money("amount", raw))
        .transpose()?;

    let receipt = web::block(move || {
        state
            .payments
            .process_payment(&actor, order_id, body.payment_method_id, amount)
    })
    .await??;

    Ok(HttpResponse::Created().json(PaymentReceiptResponse::from(receipt)))
}

/// POST /payments/{id}/refunds
///
/// Admin-only. Records the refund as a new payment with a negative amount.
#[utoipa::path(
    post,
    path = "/payments/{id}/refunds",
    params(
        ("id" = Uuid, Path, description = "UUID of the payment to refund"),
    ),
    request_body = RefundRequestBody,
    responses(
        (status = 201, description = "Refund recorded", body = PaymentResponse),
        (status = 400, description = "Amount exceeds what is left to refund"),
        (status = 402, description = "Refund declined"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Payment cannot be refunded"),
    ),
    security(("bearer" = [])),
    tag = "payments"
)]
pub async fn process_refund(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
    body: Option<web::Json<RefundRequestBody>>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let amount = body
        .amount
        .as_deref()
        .map(|raw| parse_money("amount", raw))
        .transpose()?;

    let refund = web::block(move || {
        state
            .payments
            .process_refund(&actor, payment_id, amount, body.reason)
    })
    .await??;

    Ok(HttpResponse::Created().json(PaymentResponse::from(refund)))
}
