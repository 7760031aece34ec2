use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payout::{PayoutShare, PayoutStatus, VendorPayout};
use crate::domain::ports::PayoutRepository;
use crate::schema::vendor_payouts;

use super::models::{NewVendorPayoutRow, VendorPayoutRow};
use super::outbox::{self, ORDER_AGGREGATE};

pub struct DieselPayoutRepository {
    pool: DbPool,
}

impl DieselPayoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PayoutRepository for DieselPayoutRepository {
    fn insert_for_order(
        &self,
        order_id: Uuid,
        shares: &[PayoutShare],
    ) -> Result<Vec<VendorPayout>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows: Vec<NewVendorPayoutRow> = shares
                .iter()
                .map(|s| NewVendorPayoutRow {
                    id: Uuid::new_v4(),
                    vendor_id: s.vendor_id,
                    order_id,
                    amount: s.amount.clone(),
                    platform_fee: s.platform_fee.clone(),
                    status: PayoutStatus::Pending.as_str().to_string(),
                })
                .collect();

            // Re-runs skip vendors that already have a payout for this order.
            let inserted = diesel::insert_into(vendor_payouts::table)
                .values(&rows)
                .on_conflict((vendor_payouts::vendor_id, vendor_payouts::order_id))
                .do_nothing()
                .execute(conn)?;

            let payouts = vendor_payouts::table
                .filter(vendor_payouts::order_id.eq(order_id))
                .order(vendor_payouts::vendor_id.asc())
                .select(VendorPayoutRow::as_select())
                .load(conn)?
                .into_iter()
                .map(VendorPayoutRow::into_domain)
                .collect::<Result<Vec<_>, _>>()?;

            if inserted > 0 {
                let entries: Vec<serde_json::Value> = payouts
                    .iter()
                    .map(|p| {
                        json!({
                            "vendor_id": p.vendor_id,
                            "amount": p.amount.to_string(),
                            "platform_fee": p.platform_fee.to_string(),
                        })
                    })
                    .collect();
                outbox::append(
                    conn,
                    ORDER_AGGREGATE,
                    order_id,
                    "PayoutsScheduled",
                    json!({ "order_id": order_id, "payouts": entries }),
                )?;
            }

            Ok(payouts)
        })
    }

    fn list_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<VendorPayout>, DomainError> {
        let mut conn = self.pool.get()?;

        vendor_payouts::table
            .filter(vendor_payouts::vendor_id.eq(vendor_id))
            .order(vendor_payouts::created_at.desc())
            .select(VendorPayoutRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(VendorPayoutRow::into_domain)
            .collect()
    }
}
