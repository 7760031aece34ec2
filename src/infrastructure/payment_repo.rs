use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderPaymentStatus, OrderStatus, PaymentOutcome};
use crate::domain::payment::{
    completed_refund_total, refundable_remaining, status_after_refund, NewPayment, Payment,
    PaymentMethod, PaymentStatus, SettledCharge, Settlement,
};
use crate::domain::ports::PaymentRepository;
use crate::schema::{orders, payment_methods, payments};

use super::models::{NewPaymentRow, OrderRow, PaymentMethodRow, PaymentRow};
use super::order_repo::load_view;
use super::outbox::{self, ORDER_AGGREGATE, PAYMENT_AGGREGATE};
use super::product_repo::apply_stock_effect;

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<NewPayment> for NewPaymentRow {
    fn from(p: NewPayment) -> Self {
        NewPaymentRow {
            id: p.id,
            order_id: p.order_id,
            user_id: p.user_id,
            payment_method_id: p.payment_method_id,
            amount: p.amount,
            currency: p.currency,
            status: p.status.as_str().to_string(),
            transaction_id: p.transaction_id,
            provider_response: p.provider_response,
            parent_payment_id: p.parent_payment_id,
            reason: p.reason,
        }
    }
}

fn insert_payment(conn: &mut PgConnection, payment: NewPayment) -> Result<Payment, DomainError> {
    diesel::insert_into(payments::table)
        .values(&NewPaymentRow::from(payment))
        .returning(PaymentRow::as_returning())
        .get_result(conn)?
        .into_domain()
}

fn locked_payment(conn: &mut PgConnection, id: Uuid) -> Result<Payment, DomainError> {
    payments::table
        .filter(payments::id.eq(id))
        .select(PaymentRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Payment"))?
        .into_domain()
}

fn refunds_for(conn: &mut PgConnection, payment_id: Uuid) -> Result<Vec<Payment>, DomainError> {
    payments::table
        .filter(payments::parent_payment_id.eq(payment_id))
        .order(payments::created_at.asc())
        .select(PaymentRow::as_select())
        .load(conn)?
        .into_iter()
        .map(PaymentRow::into_domain)
        .collect()
}

/// Writes the verdict onto a row that is still `processing`.
fn settle_row(
    conn: &mut PgConnection,
    id: Uuid,
    settlement: Settlement,
) -> Result<Payment, DomainError> {
    diesel::update(
        payments::table
            .filter(payments::id.eq(id))
            .filter(payments::status.eq(PaymentStatus::Processing.as_str())),
    )
    .set((
        payments::status.eq(settlement.status.as_str()),
        payments::transaction_id.eq(Some(settlement.transaction_id)),
        payments::provider_response.eq(settlement.provider_response),
        payments::updated_at.eq(Utc::now()),
    ))
    .returning(PaymentRow::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or(DomainError::NotFound("Payment"))?
    .into_domain()
}

impl PaymentRepository for DieselPaymentRepository {
    fn find_method(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError> {
        let mut conn = self.pool.get()?;

        payment_methods::table
            .filter(payment_methods::id.eq(id))
            .select(PaymentMethodRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(PaymentMethodRow::into_domain)
            .transpose()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        let mut conn = self.pool.get()?;

        payments::table
            .filter(payments::id.eq(id))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(PaymentRow::into_domain)
            .transpose()
    }

    fn refunds_of(&self, payment_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        let mut conn = self.pool.get()?;
        refunds_for(&mut conn, payment_id)
    }

    fn begin_charge(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Concurrent claims on the same order queue up behind this lock.
            let order = orders::table
                .filter(orders::id.eq(payment.order_id))
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Order"))?;

            if order.status != OrderStatus::Pending.as_str()
                || order.payment_status != OrderPaymentStatus::Pending.as_str()
            {
                return Err(DomainError::invalid_transition(
                    order.status,
                    OrderStatus::Processing,
                ));
            }

            let active: i64 = payments::table
                .filter(payments::order_id.eq(order.id))
                .filter(payments::parent_payment_id.is_null())
                .filter(payments::status.eq_any(vec![
                    PaymentStatus::Processing.as_str(),
                    PaymentStatus::Completed.as_str(),
                ]))
                .select(count_star())
                .first(conn)?;
            if active > 0 {
                return Err(DomainError::invalid_transition(
                    PaymentStatus::Processing,
                    PaymentStatus::Processing,
                ));
            }

            insert_payment(conn, payment)
        })
    }

    fn settle_charge(
        &self,
        payment_id: Uuid,
        settlement: Settlement,
        outcome: PaymentOutcome,
    ) -> Result<SettledCharge, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            let stored = settle_row(conn, payment_id, settlement)?;
            let order_id = stored.order_id;

            // A cancel may have landed while the gateway was busy.
            let moved = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::status.eq(OrderStatus::Pending.as_str()))
                    .filter(orders::payment_status.eq(OrderPaymentStatus::Pending.as_str())),
            )
            .set((
                orders::status.eq(outcome.status.as_str()),
                orders::payment_status.eq(outcome.payment_status.as_str()),
                orders::updated_at.eq(now),
            ))
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;

            let order_updated = match moved {
                Some(row) => {
                    let view = load_view(conn, row)?;
                    let effect = OrderStatus::Pending.stock_effect(outcome.status);
                    apply_stock_effect(conn, &view.item_inputs(), effect)?;
                    true
                }
                None => false,
            };

            let event_type = match stored.status {
                PaymentStatus::Completed => "PaymentCompleted",
                _ => "PaymentFailed",
            };
            outbox::append(
                conn,
                ORDER_AGGREGATE,
                order_id,
                event_type,
                json!({
                    "order_id": order_id,
                    "payment_id": stored.id,
                    "amount": stored.amount.to_string(),
                    "currency": stored.currency,
                    "transaction_id": stored.transaction_id,
                    "status": outcome.status,
                    "payment_status": outcome.payment_status,
                    "order_updated": order_updated,
                    "at": now,
                }),
            )?;

            Ok(SettledCharge {
                payment: stored,
                order_updated,
            })
        })
    }

    fn begin_refund(&self, refund: NewPayment) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let parent_id = refund
                .parent_payment_id
                .ok_or_else(|| DomainError::InvalidInput("a refund needs a parent".to_string()))?;
            let parent = locked_payment(conn, parent_id)?;
            if !parent.status.is_refundable() {
                return Err(DomainError::invalid_transition(
                    parent.status,
                    PaymentStatus::Refunded,
                ));
            }

            let remaining = refundable_remaining(&parent.amount, &refunds_for(conn, parent_id)?);
            if refund.amount.abs() > remaining {
                return Err(DomainError::InvalidInput(format!(
                    "refund amount exceeds the refundable remainder of {}",
                    remaining
                )));
            }

            insert_payment(conn, refund)
        })
    }

    fn settle_refund(
        &self,
        refund_id: Uuid,
        settlement: Settlement,
    ) -> Result<Payment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            let stored = settle_row(conn, refund_id, settlement)?;

            if let (PaymentStatus::Completed, Some(parent_id)) =
                (stored.status, stored.parent_payment_id)
            {
                let parent = locked_payment(conn, parent_id)?;
                let refunded = completed_refund_total(&refunds_for(conn, parent_id)?);
                let status = status_after_refund(&parent.amount, &refunded);

                diesel::update(payments::table.filter(payments::id.eq(parent_id)))
                    .set((
                        payments::status.eq(status.as_str()),
                        payments::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                diesel::update(orders::table.filter(orders::id.eq(stored.order_id)))
                    .set((
                        orders::payment_status.eq(OrderPaymentStatus::after_refund(status).as_str()),
                        orders::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            outbox::append(
                conn,
                PAYMENT_AGGREGATE,
                stored.id,
                "RefundRecorded",
                json!({
                    "refund_id": stored.id,
                    "payment_id": stored.parent_payment_id,
                    "order_id": stored.order_id,
                    "amount": stored.amount.to_string(),
                    "currency": stored.currency,
                    "status": stored.status.as_str(),
                    "reason": stored.reason,
                    "at": now,
                }),
            )?;

            Ok(stored)
        })
    }

    fn abandon(&self, payment_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::delete(
            payments::table
                .filter(payments::id.eq(payment_id))
                .filter(payments::status.eq(PaymentStatus::Processing.as_str())),
        )
        .execute(&mut conn)?;
        Ok(())
    }
}
