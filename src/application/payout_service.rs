use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::order::{OrderPaymentStatus, OrderView};
use crate::domain::payout::{split_by_vendor, VendorPayout};
use crate::domain::ports::{OrderRepository, PayoutRepository};

#[derive(Clone)]
pub struct PayoutService {
    payouts: Arc<dyn PayoutRepository>,
    orders: Arc<dyn OrderRepository>,
    fee_rate: BigDecimal,
}

impl PayoutService {
    pub fn new(
        payouts: Arc<dyn PayoutRepository>,
        orders: Arc<dyn OrderRepository>,
        fee_rate: BigDecimal,
    ) -> Self {
        Self {
            payouts,
            orders,
            fee_rate,
        }
    }

    /// Records one pending payout per vendor for a paid order. Running it
    /// again for the same order returns the rows already written.
    pub fn split(&self, order: &OrderView) -> Result<Vec<VendorPayout>, DomainError> {
        if order.payment_status != OrderPaymentStatus::Paid {
            return Err(DomainError::InvalidInput(format!(
                "order {} is not paid (payment status {})",
                order.id, order.payment_status
            )));
        }

        let shares = split_by_vendor(&order.items, &self.fee_rate);
        let payouts = self.payouts.insert_for_order(order.id, &shares)?;
        log::info!(
            "Scheduled {} vendor payout(s) for order {}",
            payouts.len(),
            order.id
        );
        Ok(payouts)
    }

    pub fn rerun(&self, actor: &Actor, order_id: Uuid) -> Result<Vec<VendorPayout>, DomainError> {
        actor.ensure_admin()?;
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound("Order"))?;
        self.split(&order)
    }

    pub fn list_for_vendor(
        &self,
        actor: &Actor,
        vendor_id: Uuid,
    ) -> Result<Vec<VendorPayout>, DomainError> {
        actor.ensure_owner_or_admin(vendor_id)?;
        self.payouts.list_for_vendor(vendor_id)
    }
}
