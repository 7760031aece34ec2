//! In-memory port implementations shared by the service tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::cart::CartItem;
use crate::domain::catalog::{Product, ProductStatus, StockLevel};
use crate::domain::errors::DomainError;
use crate::domain::identity::{Actor, Role};
use crate::domain::order::{
    Address, ListResult, NewOrder, OrderItemInput, OrderItemView, OrderPaymentStatus,
    OrderStatus, OrderView, PaymentOutcome, StatusChange, StockEffect,
};
use crate::domain::payment::{
    completed_refund_total, refundable_remaining, status_after_refund, ChargeRequest,
    GatewayError, GatewayResponse, GatewayStatus, NewPayment, Payment, PaymentMethod,
    PaymentProvider, PaymentStatus, RefundRequest, SettledCharge, Settlement,
};
use crate::domain::payout::{PayoutShare, PayoutStatus, VendorPayout};
use crate::domain::ports::{
    CartRepository, CatalogRepository, InventoryRepository, OrderRepository, PaymentGateway,
    PaymentRepository, PayoutRepository, SessionRepository,
};

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    cart: Vec<CartItem>,
    orders: HashMap<Uuid, OrderView>,
    methods: HashMap<Uuid, PaymentMethod>,
    payments: Vec<Payment>,
    payouts: Vec<VendorPayout>,
    sessions: HashMap<Uuid, (Actor, DateTime<Utc>)>,
    fail_order_create: bool,
    fail_status_update: bool,
    fail_payout_insert: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

pub fn dec(literal: &str) -> BigDecimal {
    BigDecimal::from_str(literal).expect("valid decimal literal")
}

pub fn customer() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Customer)
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
}

pub fn address() -> Address {
    Address {
        name: "Ada Lovelace".to_string(),
        line1: "12 Analytical Row".to_string(),
        line2: None,
        city: "London".to_string(),
        region: None,
        postal_code: "N1 7AA".to_string(),
        country: "GB".to_string(),
    }
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn add_product(&self, price: &str, available: i32) -> Uuid {
        self.add_vendor_product(Uuid::new_v4(), price, available)
    }

    pub fn add_vendor_product(&self, vendor_id: Uuid, price: &str, available: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().products.insert(
            id,
            Product {
                id,
                vendor_id,
                name: format!("Product {}", &id.simple().to_string()[..8]),
                image_url: None,
                price: dec(price),
                status: ProductStatus::Active,
                stock: StockLevel {
                    product_id: id,
                    available,
                    reserved: 0,
                },
            },
        );
        id
    }

    pub fn set_product_status(&self, id: Uuid, status: ProductStatus) {
        if let Some(p) = self.lock().products.get_mut(&id) {
            p.status = status;
        }
    }

    pub fn set_price(&self, id: Uuid, price: &str) {
        if let Some(p) = self.lock().products.get_mut(&id) {
            p.price = dec(price);
        }
    }

    pub fn stock(&self, id: Uuid) -> StockLevel {
        self.lock().products[&id].stock
    }

    pub fn add_method(&self, user_id: Uuid, provider: PaymentProvider) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().methods.insert(
            id,
            PaymentMethod {
                id,
                user_id,
                provider,
                label: "test card".to_string(),
            },
        );
        id
    }

    pub fn add_session(&self, actor: Actor, expires_at: DateTime<Utc>) -> Uuid {
        let token = Uuid::new_v4();
        self.lock().sessions.insert(token, (actor, expires_at));
        token
    }

    pub fn fail_next_order_create(&self) {
        self.lock().fail_order_create = true;
    }

    pub fn fail_next_status_update(&self) {
        self.lock().fail_status_update = true;
    }

    pub fn fail_next_payout_insert(&self) {
        self.lock().fail_payout_insert = true;
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn order(&self, id: Uuid) -> OrderView {
        self.lock().orders[&id].clone()
    }

    pub fn cart_of(&self, customer_id: Uuid) -> Vec<CartItem> {
        self.lock()
            .cart
            .iter()
            .filter(|i| i.customer_id == customer_id)
            .cloned()
            .collect()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.lock().payments.clone()
    }

    pub fn payouts(&self) -> Vec<VendorPayout> {
        self.lock().payouts.clone()
    }
}

impl CatalogRepository for MemoryStore {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

impl InventoryRepository for MemoryStore {
    fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, DomainError> {
        Ok(self.lock().products.get(&product_id).map(|p| p.stock))
    }

    fn try_reserve(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<StockLevel>, DomainError> {
        let mut state = self.lock();
        let Some(product) = state.products.get_mut(&product_id) else {
            return Ok(None);
        };
        let Some(next) = product.stock.reserved_by(quantity) else {
            return Ok(None);
        };
        product.stock = next;
        Ok(Some(next))
    }

    fn release(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<StockLevel>, DomainError> {
        let mut state = self.lock();
        Ok(state.products.get_mut(&product_id).map(|product| {
            product.stock = product.stock.released_by(quantity);
            product.stock
        }))
    }
}

impl CartRepository for MemoryStore {
    fn items_for(&self, customer_id: Uuid) -> Result<Vec<CartItem>, DomainError> {
        Ok(self.cart_of(customer_id))
    }

    fn find_item(&self, item_id: Uuid) -> Result<Option<CartItem>, DomainError> {
        Ok(self.lock().cart.iter().find(|i| i.id == item_id).cloned())
    }

    fn add(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, DomainError> {
        let mut state = self.lock();
        if let Some(existing) = state
            .cart
            .iter_mut()
            .find(|i| i.customer_id == customer_id && i.product_id == product_id)
        {
            existing.quantity += quantity;
            return Ok(existing.clone());
        }
        let item = CartItem {
            id: Uuid::new_v4(),
            customer_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        state.cart.push(item.clone());
        Ok(item)
    }

    fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>, DomainError> {
        let mut state = self.lock();
        Ok(state
            .cart
            .iter_mut()
            .find(|i| i.id == item_id)
            .map(|item| {
                item.quantity = quantity;
                item.clone()
            }))
    }

    fn remove(&self, item_id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock();
        let before = state.cart.len();
        state.cart.retain(|i| i.id != item_id);
        Ok(state.cart.len() != before)
    }

    fn clear(&self, customer_id: Uuid) -> Result<usize, DomainError> {
        let mut state = self.lock();
        let before = state.cart.len();
        state.cart.retain(|i| i.customer_id != customer_id);
        Ok(before - state.cart.len())
    }
}

impl OrderRepository for MemoryStore {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_order_create) {
            return Err(DomainError::Persistence("order_items insert failed".to_string()));
        }
        let now = Utc::now();
        let view = OrderView {
            id: order.id,
            customer_id: order.customer_id,
            status: OrderStatus::Pending,
            payment_status: OrderPaymentStatus::Pending,
            subtotal: order.totals.subtotal,
            tax_amount: order.totals.tax_amount,
            shipping_amount: order.totals.shipping_amount,
            discount_amount: order.totals.discount_amount,
            total_amount: order.totals.total_amount,
            currency: order.currency,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method_id: order.payment_method_id,
            notes: order.notes,
            tracking_number: None,
            cancellation_reason: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemView {
                    id: i.id,
                    product_id: i.product_id,
                    vendor_id: i.vendor_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    total_price: i.total_price,
                    product_snapshot: i.product_snapshot,
                })
                .collect(),
        };
        state.orders.insert(view.id, view.clone());
        Ok(view)
    }

    fn discard(&self, order_id: Uuid) -> Result<(), DomainError> {
        self.lock().orders.remove(&order_id);
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    fn list(
        &self,
        customer_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let state = self.lock();
        let mut all: Vec<OrderView> = state
            .orders
            .values()
            .filter(|o| customer_id.map_or(true, |c| o.customer_id == c))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .map(|mut o| {
                o.items.clear();
                o
            })
            .collect();
        Ok(ListResult { items, total })
    }

    fn update_status(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if std::mem::take(&mut state.fail_status_update) {
            return Err(DomainError::Persistence("products update failed".to_string()));
        }
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.status != change.from {
            return Ok(None);
        }
        apply_effect(
            &mut state.products,
            &order.item_inputs(),
            change.from.stock_effect(change.to),
        );
        order.status = change.to;
        order.updated_at = change.at;
        match change.to {
            OrderStatus::Shipped => {
                order.tracking_number = change.tracking_number.clone();
                order.shipped_at = Some(change.at);
            }
            OrderStatus::Delivered => order.delivered_at = Some(change.at),
            OrderStatus::Cancelled => {
                order.cancellation_reason = change.reason.clone();
                order.cancelled_at = Some(change.at);
            }
            _ => {}
        }
        Ok(Some(order.clone()))
    }
}

fn apply_effect(
    products: &mut HashMap<Uuid, Product>,
    items: &[OrderItemInput],
    effect: StockEffect,
) {
    for item in items {
        if let Some(product) = products.get_mut(&item.product_id) {
            product.stock = effect.apply(product.stock, item.quantity);
        }
    }
}

fn settle(payments: &mut [Payment], id: Uuid, settlement: Settlement) -> Result<Payment, DomainError> {
    let payment = payments
        .iter_mut()
        .find(|p| p.id == id && p.status == PaymentStatus::Processing)
        .ok_or(DomainError::NotFound("Payment"))?;
    payment.status = settlement.status;
    payment.transaction_id = Some(settlement.transaction_id);
    payment.provider_response = settlement.provider_response;
    Ok(payment.clone())
}

fn payment_from(new: NewPayment) -> Payment {
    Payment {
        id: new.id,
        order_id: new.order_id,
        user_id: new.user_id,
        payment_method_id: new.payment_method_id,
        amount: new.amount,
        currency: new.currency,
        status: new.status,
        transaction_id: new.transaction_id,
        provider_response: new.provider_response,
        parent_payment_id: new.parent_payment_id,
        reason: new.reason,
        created_at: Utc::now(),
    }
}

impl PaymentRepository for MemoryStore {
    fn find_method(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError> {
        Ok(self.lock().methods.get(&id).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, DomainError> {
        Ok(self.lock().payments.iter().find(|p| p.id == id).cloned())
    }

    fn refunds_of(&self, payment_id: Uuid) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|p| p.parent_payment_id == Some(payment_id))
            .cloned()
            .collect())
    }

    fn begin_charge(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let mut state = self.lock();
        let order = state
            .orders
            .get(&payment.order_id)
            .ok_or(DomainError::NotFound("Order"))?;
        if order.status != OrderStatus::Pending
            || order.payment_status != OrderPaymentStatus::Pending
        {
            return Err(DomainError::invalid_transition(order.status, OrderStatus::Processing));
        }
        let live = state.payments.iter().any(|p| {
            p.order_id == payment.order_id
                && !p.is_refund()
                && matches!(p.status, PaymentStatus::Processing | PaymentStatus::Completed)
        });
        if live {
            return Err(DomainError::invalid_transition(
                PaymentStatus::Processing,
                PaymentStatus::Processing,
            ));
        }
        let stored = payment_from(payment);
        state.payments.push(stored.clone());
        Ok(stored)
    }

    fn settle_charge(
        &self,
        payment_id: Uuid,
        settlement: Settlement,
        outcome: PaymentOutcome,
    ) -> Result<SettledCharge, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let payment = settle(&mut state.payments, payment_id, settlement)?;
        let pending = state.orders.get_mut(&payment.order_id).filter(|o| {
            o.status == OrderStatus::Pending && o.payment_status == OrderPaymentStatus::Pending
        });
        let order_updated = match pending {
            Some(order) => {
                order.status = outcome.status;
                order.payment_status = outcome.payment_status;
                apply_effect(
                    &mut state.products,
                    &order.item_inputs(),
                    OrderStatus::Pending.stock_effect(outcome.status),
                );
                true
            }
            None => false,
        };
        Ok(SettledCharge {
            payment,
            order_updated,
        })
    }

    fn begin_refund(&self, refund: NewPayment) -> Result<Payment, DomainError> {
        let mut state = self.lock();
        let parent = refund
            .parent_payment_id
            .and_then(|id| state.payments.iter().find(|p| p.id == id))
            .ok_or(DomainError::NotFound("Payment"))?;
        if !parent.status.is_refundable() {
            return Err(DomainError::invalid_transition(parent.status, PaymentStatus::Refunded));
        }
        let siblings: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.parent_payment_id == Some(parent.id))
            .cloned()
            .collect();
        let remaining = refundable_remaining(&parent.amount, &siblings);
        if refund.amount.abs() > remaining {
            return Err(DomainError::InvalidInput(format!(
                "refund amount exceeds the refundable remainder of {}",
                remaining
            )));
        }
        let stored = payment_from(refund);
        state.payments.push(stored.clone());
        Ok(stored)
    }

    fn settle_refund(
        &self,
        refund_id: Uuid,
        settlement: Settlement,
    ) -> Result<Payment, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let stored = settle(&mut state.payments, refund_id, settlement)?;
        let (PaymentStatus::Completed, Some(parent_id)) = (stored.status, stored.parent_payment_id)
        else {
            return Ok(stored);
        };
        let siblings: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.parent_payment_id == Some(parent_id))
            .cloned()
            .collect();
        let refunded = completed_refund_total(&siblings);
        if let Some(parent) = state.payments.iter_mut().find(|p| p.id == parent_id) {
            parent.status = status_after_refund(&parent.amount, &refunded);
            if let Some(order) = state.orders.get_mut(&parent.order_id) {
                order.payment_status = OrderPaymentStatus::after_refund(parent.status);
            }
        }
        Ok(stored)
    }

    fn abandon(&self, payment_id: Uuid) -> Result<(), DomainError> {
        self.lock()
            .payments
            .retain(|p| p.id != payment_id || p.status != PaymentStatus::Processing);
        Ok(())
    }
}

impl PayoutRepository for MemoryStore {
    fn insert_for_order(
        &self,
        order_id: Uuid,
        shares: &[PayoutShare],
    ) -> Result<Vec<VendorPayout>, DomainError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_payout_insert) {
            return Err(DomainError::Persistence("vendor_payouts insert failed".to_string()));
        }
        for share in shares {
            let exists = state
                .payouts
                .iter()
                .any(|p| p.order_id == order_id && p.vendor_id == share.vendor_id);
            if !exists {
                state.payouts.push(VendorPayout {
                    id: Uuid::new_v4(),
                    vendor_id: share.vendor_id,
                    order_id,
                    amount: share.amount.clone(),
                    platform_fee: share.platform_fee.clone(),
                    status: PayoutStatus::Pending,
                    created_at: Utc::now(),
                });
            }
        }
        Ok(state
            .payouts
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    fn list_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<VendorPayout>, DomainError> {
        Ok(self
            .lock()
            .payouts
            .iter()
            .filter(|p| p.vendor_id == vendor_id)
            .cloned()
            .collect())
    }
}

impl SessionRepository for MemoryStore {
    fn find_active(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<Actor>, DomainError> {
        Ok(self
            .lock()
            .sessions
            .get(&token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(actor, _)| *actor))
    }
}

/// Gateway that always answers the same way and counts its calls.
pub struct ScriptedGateway {
    status: Option<GatewayStatus>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn approving() -> Arc<Self> {
        Arc::new(Self {
            status: Some(GatewayStatus::Completed),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            status: Some(GatewayStatus::Failed),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            status: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, kind: &str) -> Result<GatewayResponse, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.status.ok_or_else(|| GatewayError {
            provider: "scripted",
            message: "connection refused".to_string(),
        })?;
        Ok(GatewayResponse {
            status,
            transaction_id: format!("{kind}_{n}"),
            raw_response: json!({ "kind": kind, "approved": status == GatewayStatus::Completed }),
        })
    }
}

impl PaymentGateway for ScriptedGateway {
    fn charge(&self, _request: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        self.answer("ch")
    }

    fn refund(&self, _request: &RefundRequest) -> Result<GatewayResponse, GatewayError> {
        self.answer("re")
    }
}

/// Parks every call until the test opens the gate, then answers like `inner`.
pub struct GatedGateway {
    inner: Arc<ScriptedGateway>,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

/// The test's side of a [`GatedGateway`].
pub struct Gate {
    entered: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl GatedGateway {
    pub fn new(inner: Arc<ScriptedGateway>) -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gateway = Arc::new(Self {
            inner,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (
            gateway,
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }

    fn pass(&self) {
        let _ = self.entered.lock().expect("gate poisoned").send(());
        let _ = self
            .release
            .lock()
            .expect("gate poisoned")
            .recv_timeout(Duration::from_secs(5));
    }
}

impl Gate {
    /// Blocks until a call has reached the gateway.
    pub fn wait_for_call(&self) {
        self.entered
            .recv_timeout(Duration::from_secs(5))
            .expect("gateway was never called");
    }

    /// Lets one parked (or future) call through.
    pub fn open(&self) {
        self.release.send(()).expect("gateway dropped");
    }
}

impl PaymentGateway for GatedGateway {
    fn charge(&self, request: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        self.pass();
        self.inner.charge(request)
    }

    fn refund(&self, request: &RefundRequest) -> Result<GatewayResponse, GatewayError> {
        self.pass();
        self.inner.refund(request)
    }
}
