pub mod auth;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod payouts;

use actix_web::web;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Marketplace service", description = "Cart, checkout, payments and vendor payouts"),
    paths(
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::checkout,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::cancel_order,
        payments::process_payment,
        payments::process_refund,
        payouts::rerun_payouts,
        payouts::list_vendor_payouts,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "cart", description = "The caller's shopping cart"),
        (name = "orders", description = "Order workflow"),
        (name = "payments", description = "Charges and refunds"),
        (name = "payouts", description = "Vendor payouts"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// Registers every JSON route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(cart::get_cart))
            .route("", web::delete().to(cart::clear_cart))
            .route("/items", web::post().to(cart::add_item))
            .route("/items/{id}", web::patch().to(cart::update_item))
            .route("/items/{id}", web::delete().to(cart::remove_item))
            .route("/checkout", web::post().to(cart::checkout)),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(orders::create_order))
            .route("", web::get().to(orders::list_orders))
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/status", web::patch().to(orders::update_order_status))
            .route("/{id}/cancel", web::post().to(orders::cancel_order))
            .route("/{id}/payments", web::post().to(payments::process_payment))
            .route("/{id}/payouts", web::post().to(payouts::rerun_payouts)),
    )
    .route(
        "/payments/{id}/refunds",
        web::post().to(payments::process_refund),
    )
    .route(
        "/vendors/{id}/payouts",
        web::get().to(payouts::list_vendor_payouts),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::header::AUTHORIZATION;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use uuid::Uuid;

    use super::*;
    use crate::application::testing::{admin, customer, dec, MemoryStore, ScriptedGateway};
    use crate::domain::identity::Actor;
    use crate::domain::payment::PaymentProvider;
    use crate::domain::pricing::PricingPolicy;
    use crate::state::{AppState, Ports};

    fn state(store: &Arc<MemoryStore>, gateway: Arc<ScriptedGateway>) -> AppState {
        AppState::new(
            Ports {
                catalog: store.clone(),
                inventory: store.clone(),
                carts: store.clone(),
                orders: store.clone(),
                payments: store.clone(),
                payouts: store.clone(),
                sessions: store.clone(),
                gateway,
            },
            PricingPolicy::default(),
            dec("0.15"),
            "USD",
        )
    }

    fn bearer(store: &MemoryStore, actor: Actor) -> String {
        let token = store.add_session(actor, Utc::now() + Duration::hours(1));
        format!("Bearer {token}")
    }

    fn address_json() -> Value {
        json!({
            "name": "Ada Lovelace",
            "line1": "12 Analytical Row",
            "city": "London",
            "postal_code": "N1 7AA",
            "country": "GB"
        })
    }

    #[actix_web::test]
    async fn requests_without_a_session_are_rejected() {
        let store = MemoryStore::shared();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&store, ScriptedGateway::approving())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/cart").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/orders")
            .insert_header((AUTHORIZATION, format!("Bearer {}", Uuid::new_v4())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn cart_checkout_and_payment_flow() {
        let store = MemoryStore::shared();
        let vendor = Uuid::new_v4();
        let product = store.add_vendor_product(vendor, "40.00", 5);
        let me = customer();
        let method = store.add_method(me.user_id, PaymentProvider::Stripe);
        let auth = bearer(&store, me);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&store, ScriptedGateway::approving())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/cart/items")
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({ "product_id": product, "quantity": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/cart")
            .insert_header((AUTHORIZATION, auth.clone()))
            .to_request();
        let cart: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart["subtotal"], "80.00");
        assert_eq!(cart["total_quantity"], 2);

        let req = test::TestRequest::post()
            .uri("/cart/checkout")
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({ "shipping_address": address_json() }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let order: Value = test::read_body_json(resp).await;
        assert_eq!(order["status"], "pending");
        assert_eq!(order["total_amount"], "91.40");
        let order_id = order["id"].as_str().expect("order id").to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/orders/{order_id}/payments"))
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({ "payment_method_id": method, "amount": "91.40" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let receipt: Value = test::read_body_json(resp).await;
        assert_eq!(receipt["order"]["status"], "processing");
        assert_eq!(receipt["order"]["payment_status"], "paid");
        assert_eq!(receipt["payouts"][0]["amount"], "68.00");
        assert_eq!(receipt["payouts"][0]["platform_fee"], "12.00");

        let req = test::TestRequest::post()
            .uri(&format!("/orders/{order_id}/payments"))
            .insert_header((AUTHORIZATION, auth))
            .set_json(json!({ "payment_method_id": method }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn domain_failures_map_to_statuses() {
        let store = MemoryStore::shared();
        let product = store.add_product("10.00", 1);
        let me = customer();
        let auth = bearer(&store, me);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&store, ScriptedGateway::declining())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/cart/checkout")
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({ "shipping_address": address_json() }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header((AUTHORIZATION, auth.clone()))
            .set_json(json!({
                "items": [{ "product_id": product, "quantity": 3 }],
                "shipping_address": address_json()
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("Insufficient stock"));

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", Uuid::new_v4()))
            .insert_header((AUTHORIZATION, auth.clone()))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::get()
            .uri(&format!("/cart?customer_id={}", Uuid::new_v4()))
            .insert_header((AUTHORIZATION, auth))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn status_changes_are_admin_only() {
        let store = MemoryStore::shared();
        let product = store.add_product("10.00", 4);
        let me = customer();
        let customer_auth = bearer(&store, me);
        let admin_auth = bearer(&store, admin());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&store, ScriptedGateway::approving())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header((AUTHORIZATION, customer_auth.clone()))
            .set_json(json!({
                "items": [{ "product_id": product, "quantity": 1 }],
                "shipping_address": address_json()
            }))
            .to_request();
        let order: Value = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/orders/{}/status", order["id"].as_str().expect("id"));

        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header((AUTHORIZATION, customer_auth))
            .set_json(json!({ "status": "processing" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header((AUTHORIZATION, admin_auth.clone()))
            .set_json(json!({ "status": "teleported" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header((AUTHORIZATION, admin_auth))
            .set_json(json!({ "status": "processing" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["status"], "processing");
    }

    #[::core::prelude::v1::test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/cart",
            "/cart/items",
            "/cart/items/{id}",
            "/cart/checkout",
            "/orders",
            "/orders/{id}",
            "/orders/{id}/status",
            "/orders/{id}/cancel",
            "/orders/{id}/payments",
            "/orders/{id}/payouts",
            "/payments/{id}/refunds",
            "/vendors/{id}/payouts",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
