use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::cart::{CartItem, CartLine, CartSummary};
use crate::domain::errors::DomainError;
use crate::domain::identity::Actor;
use crate::domain::order::OrderItemInput;
use crate::domain::ports::{CartRepository, CatalogRepository};
use crate::domain::pricing::PricingPolicy;

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogRepository>,
    pricing: PricingPolicy,
}

impl CartService {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        catalog: Arc<dyn CatalogRepository>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            carts,
            catalog,
            pricing,
        }
    }

    /// Cart lines joined with live product data plus a priced summary.
    pub fn get(&self, actor: &Actor, customer_id: Uuid) -> Result<CartSummary, DomainError> {
        actor.ensure_owner_or_admin(customer_id)?;

        let items = self.carts.items_for(customer_id)?;
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let mut products: HashMap<Uuid, _> = self
            .catalog
            .find_products(&ids)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let lines = items
            .into_iter()
            .filter_map(|item| {
                let product = products.remove(&item.product_id);
                if product.is_none() {
                    log::warn!(
                        "Cart item {} points at missing product {}",
                        item.id,
                        item.product_id
                    );
                }
                product.map(|product| CartLine { item, product })
            })
            .collect();

        Ok(CartSummary::build(customer_id, lines, &self.pricing))
    }

    pub fn add_item(
        &self,
        actor: &Actor,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must be at least 1, got {quantity}"
            )));
        }
        let product = self
            .catalog
            .find_product(product_id)?
            .ok_or(DomainError::NotFound("Product"))?;
        if !product.is_purchasable() {
            return Err(DomainError::InvalidInput(format!(
                "product {product_id} is {}",
                product.status
            )));
        }

        let item = self.carts.add(actor.user_id, product_id, quantity)?;
        log::info!(
            "Cart of {} now holds {} x {}",
            actor.user_id,
            item.quantity,
            product_id
        );
        Ok(item)
    }

    /// Sets a line's quantity; zero or less removes the line and returns `None`.
    pub fn update_quantity(
        &self,
        actor: &Actor,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItem>, DomainError> {
        self.owned_item(actor, item_id)?;
        if quantity <= 0 {
            self.carts.remove(item_id)?;
            return Ok(None);
        }
        self.carts
            .set_quantity(item_id, quantity)?
            .map(Some)
            .ok_or(DomainError::NotFound("Cart item"))
    }

    pub fn remove_item(&self, actor: &Actor, item_id: Uuid) -> Result<(), DomainError> {
        self.owned_item(actor, item_id)?;
        if self.carts.remove(item_id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Cart item"))
        }
    }

    pub fn clear(&self, actor: &Actor, customer_id: Uuid) -> Result<usize, DomainError> {
        actor.ensure_owner(customer_id)?;
        self.carts.clear(customer_id)
    }

    /// The cart's contents as checkout input.
    pub fn checkout_items(&self, actor: &Actor) -> Result<Vec<OrderItemInput>, DomainError> {
        Ok(self
            .carts
            .items_for(actor.user_id)?
            .into_iter()
            .map(|i| OrderItemInput {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect())
    }

    /// Puts the lines of an abandoned order back into the customer's cart.
    pub(crate) fn restore(
        &self,
        customer_id: Uuid,
        items: &[OrderItemInput],
    ) -> Result<(), DomainError> {
        for item in items {
            self.carts.add(customer_id, item.product_id, item.quantity)?;
        }
        Ok(())
    }

    pub(crate) fn clear_after_checkout(&self, customer_id: Uuid) -> Result<usize, DomainError> {
        self.carts.clear(customer_id)
    }

    fn owned_item(&self, actor: &Actor, item_id: Uuid) -> Result<CartItem, DomainError> {
        let item = self
            .carts
            .find_item(item_id)?
            .ok_or(DomainError::NotFound("Cart item"))?;
        actor.ensure_owner(item.customer_id)?;
        Ok(item)
    }
}
