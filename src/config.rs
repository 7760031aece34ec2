use std::env;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::pricing::PricingPolicy;
use crate::infrastructure::GatewaySettings;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pricing: PricingPolicy,
    pub platform_fee_rate: BigDecimal,
    pub currency: String,
    pub gateway: GatewaySettings,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let pricing = PricingPolicy {
            tax_rate: rate(&lookup, "TAX_RATE", "0.08")?,
            free_shipping_threshold: amount(&lookup, "FREE_SHIPPING_THRESHOLD", "100")?,
            domestic_shipping_fee: amount(&lookup, "DOMESTIC_SHIPPING_FEE", "5")?,
            international_shipping_fee: amount(&lookup, "INTERNATIONAL_SHIPPING_FEE", "15")?,
        };

        let currency = lookup("CURRENCY").unwrap_or_else(|| "USD".to_string());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid {
                key: "CURRENCY",
                value: currency,
            });
        }

        let gateway = GatewaySettings {
            stripe_success_rate: probability(&lookup, "GATEWAY_STRIPE_SUCCESS_RATE", 0.90)?,
            paypal_success_rate: probability(&lookup, "GATEWAY_PAYPAL_SUCCESS_RATE", 0.95)?,
            latency: Duration::from_millis(parsed(&lookup, "GATEWAY_LATENCY_MS", 0u64)?),
        };

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT", 8080u16)?,
            pricing,
            platform_fee_rate: rate(&lookup, "PLATFORM_FEE_RATE", "0.15")?,
            currency,
            gateway,
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn amount<F>(lookup: &F, key: &'static str, default: &str) -> Result<BigDecimal, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    match BigDecimal::from_str(value.trim()) {
        Ok(parsed) if parsed >= BigDecimal::from(0) => Ok(parsed),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

fn rate<F>(lookup: &F, key: &'static str, default: &str) -> Result<BigDecimal, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = amount(lookup, key, default)?;
    if parsed > BigDecimal::from(1) {
        return Err(ConfigError::Invalid {
            key,
            value: parsed.to_string(),
        });
    }
    Ok(parsed)
}

fn probability<F>(lookup: &F, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let p: f64 = parsed(lookup, key, default)?;
    if !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::Invalid {
            key,
            value: p.to_string(),
        });
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/shop")]).expect("valid");

        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.currency, "USD");
        assert_eq!(cfg.pricing, PricingPolicy::default());
        assert_eq!(cfg.platform_fee_rate, BigDecimal::from_str("0.15").expect("decimal"));
        assert_eq!(cfg.gateway, GatewaySettings::default());
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "9000"),
            ("TAX_RATE", "0.20"),
            ("GATEWAY_LATENCY_MS", "250"),
            ("CURRENCY", "EUR"),
        ])
        .expect("valid");

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.pricing.tax_rate, BigDecimal::from_str("0.20").expect("decimal"));
        assert_eq!(cfg.gateway.latency, Duration::from_millis(250));
        assert_eq!(cfg.currency, "EUR");
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("TAX_RATE", "1.5"),
            ("DOMESTIC_SHIPPING_FEE", "-5"),
            ("GATEWAY_PAYPAL_SUCCESS_RATE", "2"),
            ("CURRENCY", "dollars"),
        ] {
            let err = config(&[("DATABASE_URL", "postgres://db/shop"), (key, value)])
                .expect_err("should be rejected");
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }
}
