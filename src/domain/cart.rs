use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::Product;
use super::pricing::{PriceBreakdown, PricedLine, PricingPolicy, ShippingZone};

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart item joined with the live product it points at.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn line_total(&self) -> BigDecimal {
        self.priced().line_total()
    }

    fn priced(&self) -> PricedLine {
        PricedLine::new(self.product.price.clone(), self.item.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct CartSummary {
    pub customer_id: Uuid,
    pub lines: Vec<CartLine>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub totals: PriceBreakdown,
}

impl CartSummary {
    pub fn build(customer_id: Uuid, lines: Vec<CartLine>, policy: &PricingPolicy) -> Self {
        let priced: Vec<PricedLine> = lines.iter().map(CartLine::priced).collect();
        let totals = policy.calculate(&priced, &BigDecimal::from(0), ShippingZone::Domestic);
        let total_quantity = lines.iter().map(|l| i64::from(l.item.quantity)).sum();

        Self {
            customer_id,
            item_count: lines.len(),
            total_quantity,
            totals,
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
