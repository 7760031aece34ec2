use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{Product, StockLevel};
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderItemInput, StockEffect};
use crate::domain::ports::{CatalogRepository, InventoryRepository};
use crate::schema::products;

use super::models::{ProductRow, StockRow};

/// Products and their stock counters live on the same row.
pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselProductRepository {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ProductRow::into_domain)
            .transpose()
    }

    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;

        products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ProductRow::into_domain)
            .collect()
    }
}

impl InventoryRepository for DieselProductRepository {
    fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(products::table
            .filter(products::id.eq(product_id))
            .select(StockRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(StockLevel::from))
    }

    fn try_reserve(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<StockLevel>, DomainError> {
        let mut conn = self.pool.get()?;

        // The availability check and the move happen in one statement.
        Ok(diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::available_quantity.ge(quantity)),
        )
        .set((
            products::available_quantity.eq(products::available_quantity - quantity),
            products::reserved_quantity.eq(products::reserved_quantity + quantity),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(StockRow::as_returning())
        .get_result(&mut conn)
        .optional()?
        .map(StockLevel::from))
    }

    fn release(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<StockLevel>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(current) = locked_level(conn, product_id)? else {
                return Ok(None);
            };
            store_level(conn, current.released_by(quantity)).map(Some)
        })
    }
}

fn locked_level(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<Option<StockLevel>, DomainError> {
    Ok(products::table
        .filter(products::id.eq(product_id))
        .select(StockRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .map(StockLevel::from))
}

fn store_level(conn: &mut PgConnection, level: StockLevel) -> Result<StockLevel, DomainError> {
    let row = diesel::update(products::table.filter(products::id.eq(level.product_id)))
        .set((
            products::available_quantity.eq(level.available),
            products::reserved_quantity.eq(level.reserved),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(StockRow::as_returning())
        .get_result(conn)?;
    Ok(StockLevel::from(row))
}

/// Applies `effect` to every item's product inside the caller's transaction.
/// Rows are locked in product id order; deleted products are skipped.
pub(crate) fn apply_stock_effect(
    conn: &mut PgConnection,
    items: &[OrderItemInput],
    effect: StockEffect,
) -> Result<(), DomainError> {
    if effect == StockEffect::Keep {
        return Ok(());
    }
    let mut items = items.to_vec();
    items.sort_by_key(|i| i.product_id);

    for item in items {
        if let Some(level) = locked_level(conn, item.product_id)? {
            store_level(conn, effect.apply(level, item.quantity))?;
        }
    }
    Ok(())
}
