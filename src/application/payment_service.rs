use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::order::{OrderPaymentStatus, OrderStatus, OrderView, PaymentOutcome};
use crate::domain::payment::{
    refundable_remaining, ChargeRequest, NewPayment, Payment, PaymentProvider, PaymentStatus,
    RefundRequest, Settlement,
};
use crate::domain::payout::VendorPayout;
use crate::domain::ports::{OrderRepository, PaymentGateway, PaymentRepository};

use super::cart_service::CartService;
use super::payout_service::PayoutService;

/// Result of a successful charge.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub order: OrderView,
    pub payouts: Vec<VendorPayout>,
    /// The charge stands but vendor payouts still need a rerun.
    pub payouts_pending: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    carts: CartService,
    payouts: PayoutService,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        carts: CartService,
        payouts: PayoutService,
    ) -> Self {
        Self {
            orders,
            payments,
            gateway,
            carts,
            payouts,
        }
    }

    /// Charges a pending order.
    ///
    /// The order is claimed with a `processing` payment row before the
    /// gateway is called, so a second attempt fails fast with
    /// [`DomainError::InvalidTransition`]. On approval the order becomes
    /// `processing`/`paid` and vendor payouts are scheduled. On decline the
    /// order becomes `payment_failed`/`failed`, its reservations are released,
    /// its lines go back into the cart and [`DomainError::PaymentDeclined`] is
    /// returned. A gateway transport error drops the claim and changes nothing.
    /// If the order left `pending` while the gateway was busy, an approved
    /// capture is refunded straight away.
    pub fn process_payment(
        &self,
        actor: &Actor,
        order_id: Uuid,
        payment_method_id: Uuid,
        amount: Option<BigDecimal>,
    ) -> Result<PaymentReceipt, DomainError> {
        let order = self.find_order(order_id)?;
        actor.ensure_owner(order.customer_id)?;

        let method = self
            .payments
            .find_method(payment_method_id)?
            .ok_or(DomainError::NotFound("Payment method"))?;
        actor.ensure_owner(method.user_id)?;

        if order.status != OrderStatus::Pending
            || order.payment_status != OrderPaymentStatus::Pending
        {
            return Err(DomainError::invalid_transition(
                order.status,
                OrderStatus::Processing,
            ));
        }
        if let Some(amount) = amount {
            if amount != order.total_amount {
                return Err(DomainError::InvalidInput(format!(
                    "payment amount {amount} does not match order total {}",
                    order.total_amount
                )));
            }
        }

        let claim = self.payments.begin_charge(NewPayment {
            id: Uuid::new_v4(),
            order_id,
            user_id: actor.user_id,
            payment_method_id: Some(method.id),
            amount: order.total_amount.clone(),
            currency: order.currency.clone(),
            status: PaymentStatus::Processing,
            transaction_id: None,
            provider_response: json!({}),
            parent_payment_id: None,
            reason: None,
        })?;

        let response = match self.gateway.charge(&ChargeRequest {
            order_id,
            amount: order.total_amount.clone(),
            currency: order.currency.clone(),
            method: method.clone(),
        }) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Charge for order {} not attempted: {}", order_id, e);
                self.abandon(claim.id);
                return Err(e.into());
            }
        };

        let settlement = Settlement::from(response);
        let transaction_id = settlement.transaction_id.clone();
        let outcome = match settlement.status {
            PaymentStatus::Completed => PaymentOutcome::paid(),
            _ => PaymentOutcome::failed(),
        };
        let settled = self
            .payments
            .settle_charge(claim.id, settlement, outcome)
            .map_err(|e| {
                log::error!(
                    "Payment {} ({}) for order {} answered but not stored: {}",
                    claim.id,
                    transaction_id,
                    order_id,
                    e
                );
                e
            })?;
        let payment = settled.payment;
        let approved = payment.status == PaymentStatus::Completed;

        if !settled.order_updated {
            let current = self.find_order(order_id)?;
            log::warn!(
                "Order {} became {} while payment {} was in flight",
                order_id,
                current.status,
                payment.id
            );
            if approved {
                let reason = Some(format!("order {} before capture", current.status));
                if let Err(e) = self.refund_through_gateway(
                    &payment,
                    method.provider,
                    payment.amount.clone(),
                    reason,
                ) {
                    log::error!(
                        "Capture {} of order {} needs a manual refund: {}",
                        transaction_id,
                        order_id,
                        e
                    );
                }
            }
            return Err(DomainError::invalid_transition(current.status, outcome.status));
        }

        let order = self.find_order(order_id)?;

        if !approved {
            log::warn!(
                "Payment {} for order {} declined by {}",
                payment.id,
                order_id,
                method.provider.as_str()
            );
            self.restore_cart(&order);
            return Err(DomainError::PaymentDeclined { order_id });
        }

        log::info!(
            "Payment {} captured {} {} for order {}",
            payment.id,
            payment.amount,
            payment.currency,
            order_id
        );

        let (payouts, payouts_pending) = match self.payouts.split(&order) {
            Ok(payouts) => (payouts, false),
            Err(e) => {
                log::error!(
                    "Payouts for order {} not scheduled, rerun required: {}",
                    order_id,
                    e
                );
                (Vec::new(), true)
            }
        };

        Ok(PaymentReceipt {
            payment,
            order,
            payouts,
            payouts_pending,
        })
    }

    /// Refunds part or all of a settled payment as a new negative payment row.
    /// `amount` defaults to everything not yet refunded or being refunded.
    pub fn process_refund(
        &self,
        actor: &Actor,
        payment_id: Uuid,
        amount: Option<BigDecimal>,
        reason: Option<String>,
    ) -> Result<Payment, DomainError> {
        actor.ensure_admin()?;

        let original = self
            .payments
            .find_by_id(payment_id)?
            .ok_or(DomainError::NotFound("Payment"))?;
        if original.is_refund() {
            return Err(DomainError::InvalidInput(
                "a refund cannot itself be refunded".to_string(),
            ));
        }
        if !original.status.is_refundable() {
            return Err(DomainError::invalid_transition(
                original.status,
                PaymentStatus::Refunded,
            ));
        }

        let remaining =
            refundable_remaining(&original.amount, &self.payments.refunds_of(original.id)?);
        let requested = amount.unwrap_or_else(|| remaining.clone());
        if requested <= BigDecimal::from(0) || requested > remaining {
            return Err(DomainError::InvalidInput(format!(
                "refund amount {requested} must be positive and at most {remaining}"
            )));
        }

        let method_id = original
            .payment_method_id
            .ok_or(DomainError::NotFound("Payment method"))?;
        let method = self
            .payments
            .find_method(method_id)?
            .ok_or(DomainError::NotFound("Payment method"))?;

        let refund = self.refund_through_gateway(&original, method.provider, requested, reason)?;

        if refund.status != PaymentStatus::Completed {
            log::warn!("Refund of payment {} declined", original.id);
            return Err(DomainError::PaymentDeclined {
                order_id: original.order_id,
            });
        }

        log::info!(
            "Refunded {} of payment {} (refund {})",
            refund.amount.abs(),
            original.id,
            refund.id
        );
        Ok(refund)
    }

    /// Reserves the refund row, asks the gateway, then stores its verdict.
    /// Reserved and completed refunds together never exceed `original.amount`.
    fn refund_through_gateway(
        &self,
        original: &Payment,
        provider: PaymentProvider,
        amount: BigDecimal,
        reason: Option<String>,
    ) -> Result<Payment, DomainError> {
        let reserved = self.payments.begin_refund(NewPayment {
            id: Uuid::new_v4(),
            order_id: original.order_id,
            user_id: original.user_id,
            payment_method_id: original.payment_method_id,
            amount: -amount.clone(),
            currency: original.currency.clone(),
            status: PaymentStatus::Processing,
            transaction_id: None,
            provider_response: json!({}),
            parent_payment_id: Some(original.id),
            reason,
        })?;

        let response = match self.gateway.refund(&RefundRequest {
            provider,
            original_transaction_id: original.transaction_id.clone(),
            amount,
            currency: original.currency.clone(),
        }) {
            Ok(response) => response,
            Err(e) => {
                self.abandon(reserved.id);
                return Err(e.into());
            }
        };

        self.payments.settle_refund(reserved.id, Settlement::from(response))
    }

    fn abandon(&self, payment_id: Uuid) {
        if let Err(e) = self.payments.abandon(payment_id) {
            log::error!("Claim {} left in processing: {}", payment_id, e);
        }
    }

    fn find_order(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))
    }

    /// Puts a declined order's lines back into its owner's cart. Its stock
    /// was already released with the status change.
    fn restore_cart(&self, order: &OrderView) {
        if let Err(e) = self.carts.restore(order.customer_id, &order.item_inputs()) {
            log::error!("Cart of {} not restored: {}", order.customer_id, e);
        }
    }
}
