use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::order::{
    Checkout, CreateOrder, ListResult, NewOrder, NewOrderItem, OrderItemInput, OrderStatus, OrderView,
    StatusChange,
};
use crate::domain::ports::{CatalogRepository, OrderRepository};
use crate::domain::pricing::{PricedLine, PricingPolicy};

use super::cart_service::CartService;
use super::inventory::InventoryLedger;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    ledger: InventoryLedger,
    carts: CartService,
    pricing: PricingPolicy,
    currency: String,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        ledger: InventoryLedger,
        carts: CartService,
        pricing: PricingPolicy,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            catalog,
            ledger,
            carts,
            pricing,
            currency: currency.into(),
        }
    }

    /// Checkout: price the items from live product data, persist the order
    /// with its items, reserve stock for every line and empty the cart.
    ///
    /// A reservation failure releases whatever was already reserved and
    /// discards the order, so neither an orphan order nor orphan reservations
    /// survive a failed checkout.
    pub fn create_order(&self, actor: &Actor, input: CreateOrder) -> Result<OrderView, DomainError> {
        actor.ensure_owner_or_admin(input.customer_id)?;
        if input.discount_amount != BigDecimal::from(0) && !actor.is_admin() {
            return Err(DomainError::Unauthorized);
        }
        if input.discount_amount < BigDecimal::from(0) {
            return Err(DomainError::InvalidInput(
                "discount must not be negative".to_string(),
            ));
        }
        let items = merge_lines(&input.items)?;
        if items.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let products = self.load_products(&items)?;
        let new_order = self.build_order(input, &items, &products)?;
        let customer_id = new_order.customer_id;

        let order = self.orders.create(new_order)?;

        if let Err(e) = self.ledger.reserve_all(&items) {
            log::warn!("Checkout of order {} aborted: {}", order.id, e);
            if let Err(discard_err) = self.orders.discard(order.id) {
                log::error!("Failed to discard order {}: {}", order.id, discard_err);
            }
            return Err(e);
        }

        if let Err(e) = self.carts.clear_after_checkout(customer_id) {
            log::warn!("Order {} placed but cart not cleared: {}", order.id, e);
        }

        log::info!(
            "Order {} created for customer {} ({} line(s), total {})",
            order.id,
            customer_id,
            order.items.len(),
            order.total_amount
        );
        Ok(order)
    }

    /// Places an order for everything in the caller's cart.
    pub fn checkout_cart(&self, actor: &Actor, checkout: Checkout) -> Result<OrderView, DomainError> {
        let items = self.carts.checkout_items(actor)?;
        self.create_order(
            actor,
            CreateOrder {
                customer_id: actor.user_id,
                items,
                shipping_address: checkout.shipping_address,
                billing_address: checkout.billing_address,
                payment_method_id: checkout.payment_method_id,
                notes: checkout.notes,
                discount_amount: BigDecimal::from(0),
                shipping_zone: checkout.shipping_zone,
            },
        )
    }

    pub fn get_order(&self, actor: &Actor, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.find(id)?;
        actor.ensure_owner_or_admin(order.customer_id)?;
        Ok(order)
    }

    /// Newest first; customers only ever see their own orders.
    pub fn list_orders(&self, actor: &Actor, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let scope = if actor.is_admin() {
            None
        } else {
            Some(actor.user_id)
        };
        self.orders.list(scope, page, limit)
    }

    pub fn update_order_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        new_status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<OrderView, DomainError> {
        self.transition(actor, order_id, new_status, tracking_number, None)
    }

    pub fn cancel_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderView, DomainError> {
        self.transition(actor, order_id, OrderStatus::Cancelled, None, reason)
    }

    fn transition(
        &self,
        actor: &Actor,
        order_id: Uuid,
        to: OrderStatus,
        tracking_number: Option<String>,
        reason: Option<String>,
    ) -> Result<OrderView, DomainError> {
        let order = self.find(order_id)?;
        if to == OrderStatus::Cancelled {
            actor.ensure_owner_or_admin(order.customer_id)?;
        } else {
            actor.ensure_admin()?;
        }

        let from = order.status;
        if !from.can_transition_to(to) {
            return Err(DomainError::invalid_transition(from, to));
        }

        let tracking_number = tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if to == OrderStatus::Shipped && tracking_number.is_none() {
            return Err(DomainError::InvalidInput(
                "a tracking number is required to ship an order".to_string(),
            ));
        }

        let change = StatusChange {
            from,
            to,
            tracking_number,
            reason,
            at: Utc::now(),
        };
        let updated = self
            .orders
            .update_status(order_id, &change)?
            .ok_or_else(|| DomainError::invalid_transition(from, to))?;
        log::info!("Order {} moved {} -> {}", order_id, from, to);

        Ok(updated)
    }

    fn find(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))
    }

    fn load_products(
        &self,
        items: &[OrderItemInput],
    ) -> Result<HashMap<Uuid, Product>, DomainError> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .catalog
            .find_products(&ids)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        for item in items {
            let product = products
                .get(&item.product_id)
                .ok_or(DomainError::NotFound("Product"))?;
            if !product.is_purchasable() {
                return Err(DomainError::InvalidInput(format!(
                    "product {} is {}",
                    product.id, product.status
                )));
            }
        }
        Ok(products)
    }

    fn build_order(
        &self,
        input: CreateOrder,
        items: &[OrderItemInput],
        products: &HashMap<Uuid, Product>,
    ) -> Result<NewOrder, DomainError> {
        let mut priced = Vec::with_capacity(items.len());
        let mut new_items = Vec::with_capacity(items.len());
        for item in items {
            let product = products
                .get(&item.product_id)
                .ok_or(DomainError::NotFound("Product"))?;
            let line = PricedLine::new(product.price.clone(), item.quantity);
            new_items.push(NewOrderItem {
                id: Uuid::new_v4(),
                product_id: product.id,
                vendor_id: product.vendor_id,
                quantity: item.quantity,
                unit_price: product.price.clone(),
                total_price: line.line_total(),
                product_snapshot: snapshot(product),
            });
            priced.push(line);
        }

        let totals = self
            .pricing
            .calculate(&priced, &input.discount_amount, input.shipping_zone);
        let billing_address = input
            .billing_address
            .unwrap_or_else(|| input.shipping_address.clone());

        Ok(NewOrder {
            id: Uuid::new_v4(),
            customer_id: input.customer_id,
            totals,
            currency: self.currency.clone(),
            shipping_address: input.shipping_address,
            billing_address,
            payment_method_id: input.payment_method_id,
            notes: input.notes,
            items: new_items,
        })
    }
}

/// Collapses repeated products into one line, keeping first-seen order.
fn merge_lines(items: &[OrderItemInput]) -> Result<Vec<OrderItemInput>, DomainError> {
    let mut merged: Vec<OrderItemInput> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::InvalidInput(format!(
                        "quantity for product {} is too large",
                        item.product_id
                    ))
                })?;
            }
            None => merged.push(*item),
        }
    }
    Ok(merged)
}

fn snapshot(product: &Product) -> serde_json::Value {
    json!({
        "id": product.id,
        "vendor_id": product.vendor_id,
        "name": product.name,
        "image_url": product.image_url,
        "price": product.price.to_string(),
        "status": product.status.as_str(),
    })
}
