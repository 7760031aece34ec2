use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{CartItem, CartLine, CartSummary};
use crate::domain::order::{Address, Checkout};
use crate::errors::AppError;
use crate::state::AppState;

use super::auth::Authenticated;
use super::orders::{AddressDto, OrderResponse, ShippingZoneDto};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartQuery {
    /// Admins may read another customer's cart.
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    /// Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// Zero or less removes the line.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_address: AddressDto,
    pub billing_address: Option<AddressDto>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(default)]
    pub shipping_zone: ShippingZoneDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CartItem> for CartItemResponse {
    fn from(i: CartItem) -> Self {
        CartItemResponse {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: String,
    pub quantity: i32,
    pub line_total: String,
    pub available_quantity: i32,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        let line_total = line.line_total().to_string();
        CartLineResponse {
            item_id: line.item.id,
            product_id: line.product.id,
            vendor_id: line.product.vendor_id,
            name: line.product.name,
            image_url: line.product.image_url,
            unit_price: line.product.price.to_string(),
            quantity: line.item.quantity,
            line_total,
            available_quantity: line.product.stock.available,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub customer_id: Uuid,
    pub lines: Vec<CartLineResponse>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: String,
    pub tax_amount: String,
    pub shipping_amount: String,
    pub total_amount: String,
}

impl From<CartSummary> for CartResponse {
    fn from(s: CartSummary) -> Self {
        CartResponse {
            customer_id: s.customer_id,
            item_count: s.item_count,
            total_quantity: s.total_quantity,
            subtotal: s.totals.subtotal.to_string(),
            tax_amount: s.totals.tax_amount.to_string(),
            shipping_amount: s.totals.shipping_amount.to_string(),
            total_amount: s.totals.total_amount.to_string(),
            lines: s.lines.into_iter().map(CartLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearCartResponse {
    pub removed: usize,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Cart lines joined with current product data, plus a priced summary.
#[utoipa::path(
    get,
    path = "/cart",
    params(
        ("customer_id" = Option<Uuid>, Query, description = "Admins only: whose cart to read"),
    ),
    responses(
        (status = 200, description = "Cart contents", body = CartResponse),
        (status = 401, description = "Missing or expired session"),
        (status = 403, description = "Someone else's cart"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    query: web::Query<CartQuery>,
) -> Result<HttpResponse, AppError> {
    let customer_id = query.customer_id.unwrap_or(actor.user_id);

    let summary = web::block(move || state.carts.get(&actor, customer_id)).await??;

    Ok(HttpResponse::Ok().json(CartResponse::from(summary)))
}

/// POST /cart/items
///
/// Adding a product already in the cart increases its quantity.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Line added or incremented", body = CartItemResponse),
        (status = 400, description = "Bad quantity or product not for sale"),
        (status = 404, description = "Unknown product"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let item = web::block(move || state.carts.add_item(&actor, body.product_id, body.quantity))
        .await??;

    Ok(HttpResponse::Created().json(CartItemResponse::from(item)))
}

/// PATCH /cart/items/{id}
#[utoipa::path(
    patch,
    path = "/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item UUID"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = CartItemResponse),
        (status = 204, description = "Line removed"),
        (status = 403, description = "Someone else's cart"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;

    let item =
        web::block(move || state.carts.update_quantity(&actor, item_id, quantity)).await??;

    Ok(match item {
        Some(item) => HttpResponse::Ok().json(CartItemResponse::from(item)),
        None => HttpResponse::NoContent().finish(),
    })
}

/// DELETE /cart/items/{id}
#[utoipa::path(
    delete,
    path = "/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item UUID"),
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 403, description = "Someone else's cart"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();

    web::block(move || state.carts.remove_item(&actor, item_id)).await??;

    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ClearCartResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<HttpResponse, AppError> {
    let removed = web::block(move || state.carts.clear(&actor, actor.user_id)).await??;

    Ok(HttpResponse::Ok().json(ClearCartResponse { removed }))
}

/// POST /cart/checkout
///
/// Turns the caller's cart into a pending order.
#[utoipa::path(
    post,
    path = "/cart/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Cart is empty"),
        (status = 409, description = "Insufficient stock"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let checkout = Checkout {
        shipping_address: body.shipping_address.into(),
        billing_address: body.billing_address.map(Address::from),
        payment_method_id: body.payment_method_id,
        notes: body.notes,
        shipping_zone: body.shipping_zone.into(),
    };

    let order = web::block(move || state.orders.checkout_cart(&actor, checkout)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}
