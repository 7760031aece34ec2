use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::CartItem;
use crate::domain::catalog::{Product, StockLevel};
use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::order::{Address, OrderItemView, OrderView};
use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::payout::VendorPayout;
use crate::schema::{
    cart_items, commerce_order_outbox, order_items, orders, payment_methods, payments, products,
    sessions, vendor_payouts,
};

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub status: String,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_domain(self) -> Result<Product, DomainError> {
        Ok(Product {
            id: self.id,
            vendor_id: self.vendor_id,
            name: self.name,
            image_url: self.image_url,
            price: self.price,
            status: self.status.parse()?,
            stock: StockLevel {
                product_id: self.id,
                available: self.available_quantity,
                reserved: self.reserved_quantity,
            },
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub status: String,
    pub available_quantity: i32,
}

#[derive(Debug, Clone, Copy, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StockRow {
    pub id: Uuid,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
}

impl From<StockRow> for StockLevel {
    fn from(row: StockRow) -> Self {
        StockLevel {
            product_id: row.id,
            available: row.available_quantity,
            reserved: row.reserved_quantity,
        }
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: row.id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub shipping_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub shipping_address: Value,
    pub billing_address: Value,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_domain(self, items: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
        Ok(OrderView {
            id: self.id,
            customer_id: self.customer_id,
            status: self
                .status
                .parse()
                .map_err(|e: DomainError| DomainError::Persistence(e.to_string()))?,
            payment_status: self.payment_status.parse()?,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            currency: self.currency,
            shipping_address: address_from_json(self.shipping_address)?,
            billing_address: address_from_json(self.billing_address)?,
            payment_method_id: self.payment_method_id,
            notes: self.notes,
            tracking_number: self.tracking_number,
            cancellation_reason: self.cancellation_reason,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items: items.into_iter().map(OrderItemView::from).collect(),
        })
    }
}

pub fn address_to_json(address: &Address) -> Result<Value, DomainError> {
    serde_json::to_value(address).map_err(|e| DomainError::Persistence(e.to_string()))
}

fn address_from_json(value: Value) -> Result<Address, DomainError> {
    serde_json::from_value(value).map_err(|e| DomainError::Persistence(e.to_string()))
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub shipping_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub shipping_address: Value,
    pub billing_address: Value,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// `None` fields are left untouched by the update.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderStatusChangeset {
    pub status: String,
    pub updated_at: DateTime<Utc>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub product_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItemView {
    fn from(row: OrderItemRow) -> Self {
        OrderItemView {
            id: row.id,
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            product_snapshot: row.product_snapshot,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub product_snapshot: Value,
}

// ── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payment_methods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentMethodRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethodRow {
    pub fn into_domain(self) -> Result<PaymentMethod, DomainError> {
        Ok(PaymentMethod {
            id: self.id,
            user_id: self.user_id,
            provider: self.provider.parse()?,
            label: self.label,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_methods)]
pub struct NewPaymentMethodRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub label: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub provider_response: Value,
    pub parent_payment_id: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_domain(self) -> Result<Payment, DomainError> {
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            user_id: self.user_id,
            payment_method_id: self.payment_method_id,
            amount: self.amount,
            currency: self.currency,
            status: self.status.parse()?,
            transaction_id: self.transaction_id,
            provider_response: self.provider_response,
            parent_payment_id: self.parent_payment_id,
            reason: self.reason,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub provider_response: Value,
    pub parent_payment_id: Option<Uuid>,
    pub reason: Option<String>,
}

// ── Payouts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = vendor_payouts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VendorPayoutRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl VendorPayoutRow {
    pub fn into_domain(self) -> Result<VendorPayout, DomainError> {
        Ok(VendorPayout {
            id: self.id,
            vendor_id: self.vendor_id,
            order_id: self.order_id,
            amount: self.amount,
            platform_fee: self.platform_fee,
            status: self.status.parse()?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = vendor_payouts)]
pub struct NewVendorPayoutRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub status: String,
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub token: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn into_actor(self) -> Result<Actor, DomainError> {
        Ok(Actor::new(self.user_id, self.role.parse()?))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSessionRow {
    pub token: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = commerce_order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = commerce_order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
