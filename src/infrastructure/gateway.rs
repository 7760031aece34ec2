use std::thread;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use crate::domain::payment::{
    ChargeRequest, GatewayError, GatewayResponse, GatewayStatus, PaymentProvider, RefundRequest,
};
use crate::domain::ports::PaymentGateway;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Probability in `0.0..=1.0` that a Stripe call is approved.
    pub stripe_success_rate: f64,
    pub paypal_success_rate: f64,
    pub latency: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            stripe_success_rate: 0.90,
            paypal_success_rate: 0.95,
            latency: Duration::ZERO,
        }
    }
}

/// Stand-in for the card processors: approves or declines at random with a
/// fixed rate per provider.
pub struct SimulatedGateway {
    settings: GatewaySettings,
}

impl SimulatedGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        Self { settings }
    }

    fn success_rate(&self, provider: PaymentProvider) -> f64 {
        let rate = match provider {
            PaymentProvider::Stripe => self.settings.stripe_success_rate,
            PaymentProvider::Paypal => self.settings.paypal_success_rate,
        };
        rate.clamp(0.0, 1.0)
    }

    fn roll(&self, provider: PaymentProvider, kind: &str) -> GatewayResponse {
        if !self.settings.latency.is_zero() {
            thread::sleep(self.settings.latency);
        }

        let approved = rand::thread_rng().gen_bool(self.success_rate(provider));
        let transaction_id = match provider {
            PaymentProvider::Stripe => format!("{}_{}", kind, Uuid::new_v4().simple()),
            PaymentProvider::Paypal => format!("PAY-{}", Uuid::new_v4().simple()).to_uppercase(),
        };
        let status = if approved {
            GatewayStatus::Completed
        } else {
            GatewayStatus::Failed
        };

        GatewayResponse {
            raw_response: json!({
                "provider": provider.as_str(),
                "id": transaction_id,
                "type": kind,
                "status": if approved { "succeeded" } else { "declined" },
            }),
            status,
            transaction_id,
        }
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(&self, request: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        let response = self.roll(request.method.provider, "ch");
        log::debug!(
            "Simulated {} charge of {} {} for order {}: {:?}",
            request.method.provider.as_str(),
            request.amount,
            request.currency,
            request.order_id,
            response.status
        );
        Ok(response)
    }

    fn refund(&self, request: &RefundRequest) -> Result<GatewayResponse, GatewayError> {
        if request.original_transaction_id.is_none() {
            return Err(GatewayError {
                provider: request.provider.as_str(),
                message: "no transaction to refund against".to_string(),
            });
        }
        Ok(self.roll(request.provider, "re"))
    }
}
