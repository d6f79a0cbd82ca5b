use std::{env, str::FromStr};

use checkout_common::{helpers::parse_boolean_flag, FeeRate, Secret, DEFAULT_CURRENCY_CODE};
use checkout_engine::{fees::FeeSchedule, DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_SESSION_TTL_SECS};
use chrono::Duration;
use log::*;

use crate::helpers::DEFAULT_SIGNATURE_TOLERANCE_SECS;

const DEFAULT_CHK_HOST: &str = "127.0.0.1";
const DEFAULT_CHK_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkout.db";
const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When set, pending sessions are kept in Redis. Otherwise they are kept in memory, and are lost on restart.
    pub redis_url: Option<String>,
    /// How long a pending session lives before it is implicitly cancelled.
    pub session_ttl: Duration,
    /// How far back the reconciler looks for an identical paid order before creating a new one.
    pub duplicate_window: Duration,
    pub fees: FeeSchedule,
    /// Three-letter ISO currency code, lowercase, as the payment provider expects it.
    pub currency: String,
    pub stripe: StripeConfig,
    pub webhook: WebhookConfig,
    /// If supplied, in-app notifications are POSTed here. Otherwise they are only logged.
    pub notification_bus_url: Option<String>,
    /// If supplied, templated emails are POSTed here. Otherwise they are only logged.
    pub mail_service_url: Option<String>,
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHK_HOST.to_string(),
            port: DEFAULT_CHK_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: None,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            duplicate_window: Duration::seconds(DEFAULT_DUPLICATE_WINDOW_SECS),
            fees: FeeSchedule::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            stripe: StripeConfig::default(),
            webhook: WebhookConfig::default(),
            notification_bus_url: None,
            mail_service_url: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("CHK_HOST").ok().unwrap_or(defaults.host);
        let port = parse_env("CHK_PORT", defaults.port);
        let database_url = env::var("CHK_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CHK_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            defaults.database_url
        });
        let redis_url = optional_env("CHK_REDIS_URL");
        if redis_url.is_none() {
            warn!(
                "🪛️ CHK_REDIS_URL is not set. Pending payment sessions will be kept in memory and will not survive a \
                 restart."
            );
        }
        let session_ttl = parse_env_seconds("CHK_SESSION_TTL", defaults.session_ttl);
        let duplicate_window = parse_env_seconds("CHK_DUPLICATE_WINDOW", defaults.duplicate_window);
        let platform_fee_rate = parse_env("CHK_PLATFORM_FEE_RATE", defaults.fees.platform_fee_rate);
        let admin_fee_rate = parse_env("CHK_ADMIN_FEE_RATE", defaults.fees.admin_fee_rate);
        let fees = FeeSchedule::new(platform_fee_rate, admin_fee_rate);
        let currency = env::var("CHK_CURRENCY").map(|s| s.to_lowercase()).unwrap_or(defaults.currency);
        let stripe = StripeConfig::from_env_or_defaults();
        let webhook = WebhookConfig::from_env_or_defaults();
        let notification_bus_url = optional_env("CHK_NOTIFICATION_BUS_URL");
        let mail_service_url = optional_env("CHK_MAIL_SERVICE_URL");
        let event_buffer_size = parse_env("CHK_EVENT_BUFFER_SIZE", defaults.event_buffer_size);
        info!("🪛️ Platform fee rate: {}. Admin fee rate: {}", fees.platform_fee_rate, fees.admin_fee_rate);
        Self {
            host,
            port,
            database_url,
            redis_url,
            session_ttl,
            duplicate_window,
            fees,
            currency,
            stripe,
            webhook,
            notification_bus_url,
            mail_service_url,
            event_buffer_size,
        }
    }
}

//-------------------------------------------------  StripeConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    /// The base URL of the Stripe API. Only changed for testing against a mock server.
    pub api_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self { secret_key: Secret::default(), api_url: DEFAULT_STRIPE_API_URL.to_string() }
    }
}

impl StripeConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret_key = env::var("CHK_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ CHK_STRIPE_SECRET_KEY is not set. Payment intents cannot be created.");
            String::default()
        });
        let api_url = env::var("CHK_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.to_string());
        Self { secret_key: Secret::new(secret_key), api_url }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The signing secret for the webhook endpoint, as issued by Stripe.
    pub secret: Secret<String>,
    /// If false, webhook signatures are not checked at all. **DANGER**
    pub signature_checks: bool,
    /// How old a signed timestamp may be before the delivery is rejected.
    pub tolerance: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: Secret::default(),
            signature_checks: true,
            tolerance: Duration::seconds(DEFAULT_SIGNATURE_TOLERANCE_SECS),
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = env::var("CHK_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CHK_WEBHOOK_SECRET is not set. Please set it to the signing secret of your Stripe webhook \
                 endpoint."
            );
            String::default()
        });
        let signature_checks = parse_boolean_flag(env::var("CHK_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can mark sessions as paid. 🚨️");
        }
        Self { secret: Secret::new(secret), signature_checks, ..Default::default() }
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}: {s}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

fn parse_env_seconds(name: &str, default: Duration) -> Duration {
    Duration::seconds(parse_env(name, default.num_seconds()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.session_ttl, Duration::minutes(30));
        assert_eq!(config.duplicate_window, Duration::minutes(5));
        assert_eq!(config.fees.platform_fee_rate, FeeRate::from_percent(5).unwrap());
        assert_eq!(config.fees.admin_fee_rate, FeeRate::from_percent(10).unwrap());
        assert!(config.webhook.signature_checks);
        assert_eq!(config.webhook.tolerance, Duration::minutes(5));
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        env::set_var("CHK_TEST_PORT", "not-a-port");
        assert_eq!(parse_env("CHK_TEST_PORT", 8370u16), 8370);
        env::set_var("CHK_TEST_RATE", "7%");
        assert_eq!(parse_env("CHK_TEST_RATE", FeeRate::default()), FeeRate::from_percent(7).unwrap());
        env::set_var("CHK_TEST_TTL", "60");
        assert_eq!(parse_env_seconds("CHK_TEST_TTL", Duration::seconds(1)), Duration::minutes(1));
        assert_eq!(parse_env_seconds("CHK_TEST_UNSET_TTL", Duration::seconds(1)), Duration::seconds(1));
    }
}
