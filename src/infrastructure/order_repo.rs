use diesel::dsl::count_star;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, NewOrder, OrderPaymentStatus, OrderStatus, OrderView, StatusChange,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders};

use super::models::{
    address_to_json, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, OrderStatusChangeset,
};
use super::outbox::{self, ORDER_AGGREGATE};
use super::product_repo::apply_stock_effect;

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn load_view(conn: &mut PgConnection, order: OrderRow) -> Result<OrderView, DomainError> {
    let items = OrderItemRow::belonging_to(&order)
        .select(OrderItemRow::as_select())
        .order(order_items::created_at.asc())
        .load(conn)?;
    order.into_domain(items)
}

pub(crate) fn find_row(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<OrderRow>, DomainError> {
    Ok(orders::table
        .filter(orders::id.eq(id))
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?)
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let totals = &order.totals;

            // 1. Insert the order
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    customer_id: order.customer_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: OrderPaymentStatus::Pending.as_str().to_string(),
                    subtotal: totals.subtotal.clone(),
                    tax_amount: totals.tax_amount.clone(),
                    shipping_amount: totals.shipping_amount.clone(),
                    discount_amount: totals.discount_amount.clone(),
                    total_amount: totals.total_amount.clone(),
                    currency: order.currency.clone(),
                    shipping_address: address_to_json(&order.shipping_address)?,
                    billing_address: address_to_json(&order.billing_address)?,
                    payment_method_id: order.payment_method_id,
                    notes: order.notes.clone(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Insert its items
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: i.id,
                    order_id: order.id,
                    product_id: i.product_id,
                    vendor_id: i.vendor_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                    total_price: i.total_price.clone(),
                    product_snapshot: i.product_snapshot.clone(),
                })
                .collect();
            let items = diesel::insert_into(order_items::table)
                .values(&new_items)
                .returning(OrderItemRow::as_returning())
                .get_results(conn)?;

            // 3. Outbox event in the same transaction
            let lines: Vec<serde_json::Value> = order
                .items
                .iter()
                .map(|i| {
                    json!({
                        "product_id": i.product_id,
                        "vendor_id": i.vendor_id,
                        "quantity": i.quantity,
                        "unit_price": i.unit_price.to_string(),
                    })
                })
                .collect();
            outbox::append(
                conn,
                ORDER_AGGREGATE,
                order.id,
                "OrderCreated",
                json!({
                    "order_id": order.id,
                    "customer_id": order.customer_id,
                    "status": OrderStatus::Pending,
                    "total_amount": totals.total_amount.to_string(),
                    "currency": order.currency,
                    "lines": lines,
                }),
            )?;

            row.into_domain(items)
        })
    }

    fn discard(&self, order_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // order_items go with it via ON DELETE CASCADE
            let deleted =
                diesel::delete(orders::table.filter(orders::id.eq(order_id))).execute(conn)?;
            if deleted > 0 {
                outbox::append(
                    conn,
                    ORDER_AGGREGATE,
                    order_id,
                    "OrderDiscarded",
                    json!({ "order_id": order_id }),
                )?;
            }
            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(order) = find_row(&mut conn, id)? else {
            return Ok(None);
        };
        load_view(&mut conn, order).map(Some)
    }

    fn list(
        &self,
        customer_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count_query = orders::table.select(count_star()).into_boxed();
            let mut page_query = orders::table.select(OrderRow::as_select()).into_boxed();
            if let Some(customer_id) = customer_id {
                count_query = count_query.filter(orders::customer_id.eq(customer_id));
                page_query = page_query.filter(orders::customer_id.eq(customer_id));
            }

            let total: i64 = count_query.get_result(conn)?;
            let rows = page_query
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            // Listings carry headers only.
            let items = rows
                .into_iter()
                .map(|o| o.into_domain(Vec::new()))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let changeset = OrderStatusChangeset {
            status: change.to.as_str().to_string(),
            updated_at: change.at,
            tracking_number: match change.to {
                OrderStatus::Shipped => change.tracking_number.clone(),
                _ => None,
            },
            cancellation_reason: match change.to {
                OrderStatus::Cancelled => change.reason.clone(),
                _ => None,
            },
            shipped_at: (change.to == OrderStatus::Shipped).then_some(change.at),
            delivered_at: (change.to == OrderStatus::Delivered).then_some(change.at),
            cancelled_at: (change.to == OrderStatus::Cancelled).then_some(change.at),
        };

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::status.eq(change.from.as_str())),
            )
            .set(&changeset)
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = updated else {
                return Ok(None);
            };

            let view = load_view(conn, row)?;
            apply_stock_effect(conn, &view.item_inputs(), change.from.stock_effect(change.to))?;

            outbox::append(
                conn,
                ORDER_AGGREGATE,
                order_id,
                "OrderStatusChanged",
                json!({
                    "order_id": order_id,
                    "from": change.from,
                    "to": change.to,
                    "tracking_number": change.tracking_number,
                    "reason": change.reason,
                    "at": change.at,
                }),
            )?;

            Ok(Some(view))
        })
    }
}
