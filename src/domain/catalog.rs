use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "draft" => Ok(ProductStatus::Draft),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(DomainError::Persistence(format!(
                "unknown product status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub stock: StockLevel,
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

/// Per-product inventory counters. `available + reserved` is the physical stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub available: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn on_hand(&self) -> i32 {
        self.available + self.reserved
    }

    pub fn can_reserve(&self, quantity: i32) -> bool {
        quantity > 0 && self.available >= quantity
    }

    /// Level after reserving `quantity`, or `None` when stock is short.
    pub fn reserved_by(&self, quantity: i32) -> Option<StockLevel> {
        self.can_reserve(quantity).then(|| StockLevel {
            available: self.available - quantity,
            reserved: self.reserved + quantity,
            ..*self
        })
    }

    /// Level after releasing `quantity`; never releases more than is reserved.
    pub fn released_by(&self, quantity: i32) -> StockLevel {
        let released = quantity.clamp(0, self.reserved);
        StockLevel {
            available: self.available + released,
            reserved: self.reserved - released,
            ..*self
        }
    }

    /// Level after reserved units leave the warehouse; physical stock shrinks.
    pub fn consumed_by(&self, quantity: i32) -> StockLevel {
        StockLevel {
            reserved: self.reserved - quantity.clamp(0, self.reserved),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(available: i32, reserved: i32) -> StockLevel {
        StockLevel {
            product_id: Uuid::nil(),
            available,
            reserved,
        }
    }

    #[test]
    fn reserve_moves_units_from_available_to_reserved() {
        let next = level(10, 0).reserved_by(4).expect("enough stock");
        assert_eq!((next.available, next.reserved), (6, 4));
        assert_eq!(next.on_hand(), 10);
    }

    #[test]
    fn reserve_refuses_more_than_available() {
        assert!(level(3, 1).reserved_by(4).is_none());
        assert!(level(3, 1).reserved_by(0).is_none());
    }

    #[test]
    fn release_is_capped_by_reserved() {
        let next = level(2, 3).released_by(10);
        assert_eq!((next.available, next.reserved), (5, 0));
    }

    #[test]
    fn reserve_then_release_round_trips() {
        let start = level(7, 2);
        let back = start.reserved_by(5).expect("enough stock").released_by(5);
        assert_eq!(back, start);
    }

    #[test]
    fn consuming_shrinks_reserved_only() {
        let next = level(4, 3).consumed_by(2);
        assert_eq!((next.available, next.reserved), (4, 1));
        assert_eq!(next.on_hand(), 5);
        assert_eq!(level(4, 1).consumed_by(5).reserved, 0);
    }

    #[test]
    fn status_parses_from_storage() {
        assert_eq!(
            "archived".parse::<ProductStatus>().expect("known status"),
            ProductStatus::Archived
        );
        assert!("deleted".parse::<ProductStatus>().is_err());
    }
}
