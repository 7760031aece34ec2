use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::CartItem;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::cart_items;

use super::models::{CartItemRow, NewCartItemRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn items_for(&self, customer_id: Uuid) -> Result<Vec<CartItem>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(cart_items::table
            .filter(cart_items::customer_id.eq(customer_id))
            .order(cart_items::created_at.asc())
            .select(CartItemRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(CartItem::from)
            .collect())
    }

    fn find_item(&self, item_id: Uuid) -> Result<Option<CartItem>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(cart_items::table
            .filter(cart_items::id.eq(item_id))
            .select(CartItemRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(CartItem::from))
    }

    fn add(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, DomainError> {
        let mut conn = self.pool.get()?;

        // One line per (customer, product): a repeat add bumps the quantity in place.
        let row = diesel::insert_into(cart_items::table)
            .values(&NewCartItemRow {
                id: Uuid::new_v4(),
                customer_id,
                product_id,
                quantity,
            })
            .on_conflict((cart_items::customer_id, cart_items::product_id))
            .do_update()
            .set((
                cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)),
                cart_items::updated_at.eq(Utc::now()),
            ))
            .returning(CartItemRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(cart_items::table.filter(cart_items::id.eq(item_id)))
            .set((
                cart_items::quantity.eq(quantity),
                cart_items::updated_at.eq(Utc::now()),
            ))
            .returning(CartItemRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(CartItem::from))
    }

    fn remove(&self, item_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted =
            diesel::delete(cart_items::table.filter(cart_items::id.eq(item_id))).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn clear(&self, customer_id: Uuid) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(
            diesel::delete(cart_items::table.filter(cart_items::customer_id.eq(customer_id)))
                .execute(&mut conn)?,
        )
    }
}
