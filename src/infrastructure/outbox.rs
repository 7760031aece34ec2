use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::schema::commerce_order_outbox;

use super::models::NewOutboxEventRow;

pub const ORDER_AGGREGATE: &str = "Order";
pub const PAYMENT_AGGREGATE: &str = "Payment";

/// Appends one event to the outbox on the caller's connection, so it commits
/// or rolls back with the state change that produced it.
///
/// Debezium's EventRouter SMT derives the Kafka topic from `aggregate_type`.
pub fn append(
    conn: &mut PgConnection,
    aggregate_type: &str,
    aggregate_id: Uuid,
    event_type: &str,
    payload: Value,
) -> Result<(), DomainError> {
    diesel::insert_into(commerce_order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}
