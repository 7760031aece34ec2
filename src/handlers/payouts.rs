use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::payout::VendorPayout;
use crate::errors::AppError;
use crate::state::AppState;

use super::auth::Authenticated;

#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutResponse {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub order_id: Uuid,
    pub amount: String,
    pub platform_fee: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<VendorPayout> for PayoutResponse {
    fn from(p: VendorPayout) -> Self {
        PayoutResponse {
            id: p.id,
            vendor_id: p.vendor_id,
            order_id: p.order_id,
            amount: p.amount.to_string(),
            platform_fee: p.platform_fee.to_string(),
            status: p.status.to_string(),
            created_at: p.created_at,
        }
    }
}

/// POST /orders/{id}/payouts
///
/// Admin-only. Schedules any vendor payouts a paid order is still missing.
#[utoipa::path(
    post,
    path = "/orders/{id}/payouts",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "All payouts of the order", body = [PayoutResponse]),
        (status = 400, description = "Order is not paid"),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer" = [])),
    tag = "payouts"
)]
pub async fn rerun_payouts(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let payouts = web::block(move || state.payouts.rerun(&actor, order_id)).await??;

    Ok(HttpResponse::Ok().json(
        payouts
            .into_iter()
            .map(PayoutResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /vendors/{id}/payouts
#[utoipa::path(
    get,
    path = "/vendors/{id}/payouts",
    params(
        ("id" = Uuid, Path, description = "Vendor UUID"),
    ),
    responses(
        (status = 200, description = "Payouts of the vendor, newest first", body = [PayoutResponse]),
        (status = 403, description = "Another vendor's payouts"),
    ),
    security(("bearer" = [])),
    tag = "payouts"
)]
pub async fn list_vendor_payouts(
    state: web::Data<AppState>,
    Authenticated(actor): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let vendor_id = path.into_inner();

    let payouts = web::block(move || state.payouts.list_for_vendor(&actor, vendor_id)).await??;

    Ok(HttpResponse::Ok().json(
        payouts
            .into_iter()
            .map(PayoutResponse::from)
            .collect::<Vec<_>>(),
    ))
}
