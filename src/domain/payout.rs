use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderItemView;
use super::pricing::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PayoutStatus::Pending),
            "processing" => Ok(PayoutStatus::Processing),
            "completed" => Ok(PayoutStatus::Completed),
            "failed" => Ok(PayoutStatus::Failed),
            other => Err(DomainError::Persistence(format!(
                "unknown payout status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VendorPayout {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

/// One vendor's cut of an order, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutShare {
    pub vendor_id: Uuid,
    pub gross: BigDecimal,
    pub platform_fee: BigDecimal,
    pub amount: BigDecimal,
}

/// Group order items by vendor and split each vendor's total into the
/// platform fee and the vendor payout. Output is ordered by vendor id.
pub fn split_by_vendor(items: &[OrderItemView], fee_rate: &BigDecimal) -> Vec<PayoutShare> {
    let mut totals: BTreeMap<Uuid, BigDecimal> = BTreeMap::new();
    for item in items {
        let entry = totals
            .entry(item.vendor_id)
            .or_insert_with(|| BigDecimal::from(0));
        *entry += &item.total_price;
    }

    totals
        .into_iter()
        .map(|(vendor_id, gross)| {
            let platform_fee = round_money(&(&gross * fee_rate));
            let amount = &gross - &platform_fee;
            PayoutShare {
                vendor_id,
                gross,
                platform_fee,
                amount,
            }
        })
        .collect()
}
