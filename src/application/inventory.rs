use std::sync::Arc;

use uuid::Uuid;

use crate::domain::catalog::StockLevel;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderItemInput;
use crate::domain::ports::InventoryRepository;

/// Reserve/release on the per-product stock rows.
///
/// A reservation either takes the full quantity or fails with
/// [`DomainError::InsufficientStock`]; it never clamps.
#[derive(Clone)]
pub struct InventoryLedger {
    repo: Arc<dyn InventoryRepository>,
}

impl InventoryLedger {
    pub fn new(repo: Arc<dyn InventoryRepository>) -> Self {
        Self { repo }
    }

    pub fn level(&self, product_id: Uuid) -> Result<StockLevel, DomainError> {
        self.repo
            .stock_level(product_id)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<StockLevel, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "reservation quantity must be positive, got {quantity}"
            )));
        }

        if let Some(level) = self.repo.try_reserve(product_id, quantity)? {
            log::debug!(
                "Reserved {} of product {} (available {}, reserved {})",
                quantity,
                product_id,
                level.available,
                level.reserved
            );
            return Ok(level);
        }

        let current = self.level(product_id)?;
        Err(DomainError::InsufficientStock {
            product_id,
            requested: quantity,
            available: current.available,
        })
    }

    pub fn release(&self, product_id: Uuid, quantity: i32) -> Result<StockLevel, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "release quantity must be positive, got {quantity}"
            )));
        }

        let level = self
            .repo
            .release(product_id, quantity)?
            .ok_or(DomainError::NotFound("Product"))?;
        log::debug!(
            "Released {} of product {} (available {}, reserved {})",
            quantity,
            product_id,
            level.available,
            level.reserved
        );
        Ok(level)
    }

    /// Reserves every line or none: on the first failure the lines already
    /// reserved are released again before the error is returned.
    pub fn reserve_all(&self, items: &[OrderItemInput]) -> Result<(), DomainError> {
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = self.reserve(item.product_id, item.quantity) {
                let taken = &items[..index];
                if !taken.is_empty() {
                    log::warn!(
                        "Reservation failed ({}); releasing {} line(s) already reserved",
                        e,
                        taken.len()
                    );
                }
                if let Err(release_err) = self.release_all(taken) {
                    log::error!("Compensating release failed: {}", release_err);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Releases every line, continuing past failures; reports the first one.
    pub fn release_all(&self, items: &[OrderItemInput]) -> Result<(), DomainError> {
        let mut first_error = None;
        for item in items {
            if let Err(e) = self.release(item.product_id, item.quantity) {
                log::error!("Failed to release product {}: {}", item.product_id, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
