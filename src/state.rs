use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::application::{
    CartService, InventoryLedger, OrderService, PaymentService, PayoutService,
    SessionAuthenticator,
};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::domain::ports::{
    CartRepository, CatalogRepository, InventoryRepository, OrderRepository, PaymentGateway,
    PaymentRepository, PayoutRepository, SessionRepository,
};
use crate::domain::pricing::PricingPolicy;
use crate::infrastructure::{
    DieselCartRepository, DieselOrderRepository, DieselPaymentRepository, DieselPayoutRepository,
    DieselProductRepository, DieselSessionRepository, SimulatedGateway,
};

/// The adapters behind every port.
#[derive(Clone)]
pub struct Ports {
    pub catalog: Arc<dyn CatalogRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub payouts: Arc<dyn PayoutRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl Ports {
    pub fn postgres(pool: DbPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        let products = Arc::new(DieselProductRepository::new(pool.clone()));
        Self {
            catalog: products.clone(),
            inventory: products,
            carts: Arc::new(DieselCartRepository::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            payments: Arc::new(DieselPaymentRepository::new(pool.clone())),
            payouts: Arc::new(DieselPayoutRepository::new(pool.clone())),
            sessions: Arc::new(DieselSessionRepository::new(pool)),
            gateway,
        }
    }
}

/// Shared by every worker through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub auth: SessionAuthenticator,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub payouts: PayoutService,
}

impl AppState {
    pub fn new(
        ports: Ports,
        pricing: PricingPolicy,
        platform_fee_rate: BigDecimal,
        currency: &str,
    ) -> Self {
        let ledger = InventoryLedger::new(ports.inventory.clone());
        let carts = CartService::new(ports.carts.clone(), ports.catalog.clone(), pricing.clone());
        let payouts = PayoutService::new(
            ports.payouts.clone(),
            ports.orders.clone(),
            platform_fee_rate,
        );
        let orders = OrderService::new(
            ports.orders.clone(),
            ports.catalog.clone(),
            ledger,
            carts.clone(),
            pricing,
            currency,
        );
        let payments = PaymentService::new(
            ports.orders,
            ports.payments,
            ports.gateway,
            carts.clone(),
            payouts.clone(),
        );

        Self {
            auth: SessionAuthenticator::new(ports.sessions),
            carts,
            orders,
            payments,
            payouts,
        }
    }

    /// Production wiring: Diesel repositories and the simulated gateway.
    pub fn from_config(pool: DbPool, config: &AppConfig) -> Self {
        let gateway = Arc::new(SimulatedGateway::new(config.gateway.clone()));
        Self::new(
            Ports::postgres(pool, gateway),
            config.pricing.clone(),
            config.platform_fee_rate.clone(),
            &config.currency,
        )
    }
}
