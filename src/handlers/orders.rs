use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{
    Address, CreateOrder, OrderItemInput, OrderItemView, OrderStatus, OrderView,
};
use crate::domain::pricing::ShippingZone;
use crate::errors::AppError;
use crate::state::AppState;

use super::auth::Authenticated;

// ── Shared DTOs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressDto {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

impl From<AddressDto> for Address {
    fn from(a: AddressDto) -> Self {
        Address {
            name: a.name,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

impl From<Address> for AddressDto {
    fn from(a: Address) -> Self {
        AddressDto {
            name: a.name,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShippingZoneDto {
    #[default]
    Domestic,
    International,
}

impl From<ShippingZoneDto> for ShippingZone {
    fn from(z: ShippingZoneDto) -> Self {
        match z {
            ShippingZoneDto::Domestic => ShippingZone::Domestic,
            ShippingZoneDto::International => ShippingZone::International,
        }
    }
}

/// Decimal amounts travel as strings to avoid floating-point issues, e.g. "9.99".
pub(crate) fn parse_money(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("{field} '{raw}' is not a decimal amount")))
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Defaults to the caller. Only admins may order for someone else.
    pub customer_id: Option<Uuid>,
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: AddressDto,
    /// Defaults to the shipping address.
    pub billing_address: Option<AddressDto>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    /// Admin-only, e.g. "10.00".
    pub discount_amount: Option<String>,
    #[serde(default)]
    pub shipping_zone: ShippingZoneDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
    pub total_price: String,
    #[schema(value_type = Object)]
    pub product_snapshot: serde_json::Value,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(i: OrderItemView) -> Self {
        OrderItemResponse {
            id: i.id,
            product_id: i.product_id,
            vendor_id: i.vendor_id,
            quantity: i.quantity,
            unit_price: i.unit_price.to_string(),
            total_price: i.total_price.to_string(),
            product_snapshot: i.product_snapshot,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub subtotal: String,
    pub tax_amount: String,
    pub shipping_amount: String,
    pub discount_amount: String,
    pub total_amount: String,
    pub currency: String,
    pub shipping_address: AddressDto,
    pub billing_address: AddressDto,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        OrderResponse {
            id: o.id,
            customer_id: o.customer_id,
            status: o.status.to_string(),
            payment_status: o.payment_status.to_string(),
            subtotal: o.subtotal.to_string(),
            tax_amount: o.tax_amount.to_string(),
            shipping_amount: o.shipping_amount.to_string(),
            discount_amount: o.discount_amount.to_string(),
            total_amount: o.total_amount.to_string(),
            currency: o.currency,
            shipping_address: o.shipping_address.into(),
            billing_address: o.billing_address.into(),
            payment_method_id: o.payment_method_id,
            notes: o.notes,
            tracking_number: o.tracking_number,
            cancellation_reason: o.cancellation_reason,
            shipped_at: o.shipped_at,
            delivered_at: o.delivered_at,
            cancelled_at: o.cancelled_at,
            created_at: o.created_at,
            updated_at: o.updated_at,
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of processing, shipped, delivered, cancelled, payment_failed
    pub status: String,
    /// Required when moving to shipped
    pub tracking_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Prices the items from current product data, persists the order with its
/// items, reserves stock for every line and clears the caller's cart.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Empty or invalid item list"),
        (status = 401, description = "Missing or expired session"),
        (status = 403, description = "Not permitted"),
        (status = 409, description = "Insufficient stock"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let discount_amount = match body.discount_amount.as_deref() {
        Some(raw) => parse_money("discount_amount", raw)?,
        None => BigDecimal::from(0),
    };
    let input = CreateOrder {
        customer_id: body.customer_id.unwrap_or(actor.user_id),
        items: body
            .items
            .iter()
            .map(|i| OrderItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect(),
        shipping_address: body.shipping_address.into(),
        billing_address: body.billing_address.map(Address::from),
        payment_method_id: body.payment_method_id,
        notes: body.notes,
        discount_amount,
        shipping_zone: body.shipping_zone.into(),
    };

    let order = web::block(move || state.orders.create_order(&actor, input)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Someone else's order"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order(&actor, order_id)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Newest first, without items. Customers see only their own orders.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || state.orders.list_orders(&actor, page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// PATCH /orders/{id}/status
///
/// Admin-only. Cancelling releases the order's reservations.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status or missing tracking number"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let status = OrderStatus::from_str(body.status.trim())?;

    let order = web::block(move || {
        state
            .orders
            .update_order_status(&actor, order_id, status, body.tracking_number)
    })
    .await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
    body: Option<web::Json<CancelOrderRequest>>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let reason = body.map(|b| b.into_inner()).unwrap_or_default().reason;

    let order =
        web::block(move || state.orders.cancel_order(&actor, order_id, reason)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
