//! Order pricing: subtotal, tax, shipping, discount and total.
//!
//! Everything here is pure. Amounts are rounded half-up to two decimal places
//! after each derived figure is computed, so identical inputs always yield
//! identical breakdowns.

use std::cmp::{max, min};
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

/// Where an order ships to; selects the flat shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingZone {
    #[default]
    Domestic,
    International,
}

/// Rates and thresholds applied by [`PricingPolicy::calculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub tax_rate: BigDecimal,
    pub free_shipping_threshold: BigDecimal,
    pub domestic_shipping_fee: BigDecimal,
    pub international_shipping_fee: BigDecimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: decimal("0.08"),
            free_shipping_threshold: BigDecimal::from(100),
            domestic_shipping_fee: BigDecimal::from(5),
            international_shipping_fee: BigDecimal::from(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn new(unit_price: BigDecimal, quantity: i32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    pub fn line_total(&self) -> BigDecimal {
        round_money(&(&self.unit_price * BigDecimal::from(self.quantity)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub shipping_amount: BigDecimal,
    /// The discount actually applied, never more than the gross amount.
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
}

impl PricingPolicy {
    pub fn shipping_fee(&self, subtotal: &BigDecimal, zone: ShippingZone) -> BigDecimal {
        if subtotal >= &self.free_shipping_threshold {
            return BigDecimal::from(0);
        }
        match zone {
            ShippingZone::Domestic => self.domestic_shipping_fee.clone(),
            ShippingZone::International => self.international_shipping_fee.clone(),
        }
    }

    pub fn calculate(
        &self,
        lines: &[PricedLine],
        discount: &BigDecimal,
        zone: ShippingZone,
    ) -> PriceBreakdown {
        let zero = BigDecimal::from(0);
        let subtotal = lines
            .iter()
            .fold(zero.clone(), |acc, line| acc + line.line_total());
        let tax_amount = round_money(&(&subtotal * &self.tax_rate));
        let shipping_amount = self.shipping_fee(&subtotal, zone);

        let gross = &subtotal + &tax_amount + &shipping_amount;
        let discount_amount = min(max(round_money(discount), zero), gross.clone());
        let total_amount = &gross - &discount_amount;

        PriceBreakdown {
            subtotal,
            tax_amount,
            shipping_amount,
            discount_amount,
            total_amount,
        }
    }
}

pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Parse a literal decimal; only for constants known to be well formed.
pub(crate) fn decimal(literal: &str) -> BigDecimal {
    BigDecimal::from_str(literal).unwrap_or_default()
}
