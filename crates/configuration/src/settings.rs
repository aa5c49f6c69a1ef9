use crate::error::ConfigError;
use core_types::TradingPair;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pair: PairConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The single market the bot trades.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    /// The asset that is bought and sold (e.g. "VTC").
    pub base: String,
    /// The pricing currency (e.g. "BTC").
    pub quote: String,
    /// Decimal places allowed in a limit price.
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    /// Decimal places allowed in an order quantity.
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
}

/// Thresholds for the pressure index, triggers and order lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum profit over the last buy price before a sell is allowed (0.02 = 2%).
    pub min_gain: Decimal,
    /// Loss below the last buy price at which selling is forced (0.02 = 2%).
    pub max_loss: Decimal,
    /// Book events priced further than this fraction from the last price are ignored.
    pub order_range: Decimal,
    pub buy_trigger: Decimal,
    pub sell_trigger: Decimal,
    /// An open order whose price drifts further than this fraction from the market is cancelled.
    pub order_variance: Decimal,
    /// Balances at or below this amount are treated as empty.
    pub dust_floor: Decimal,
    /// Units of base held back from every buy to cover fees and rounding.
    pub buy_reserve: Decimal,
    /// If the index extrema exceed this magnitude, the index is zeroed.
    pub index_reset_bound: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_gain: dec!(0.02),
            max_loss: dec!(0.02),
            order_range: dec!(0.02),
            buy_trigger: dec!(5000),
            sell_trigger: dec!(-5000),
            order_variance: dec!(0.0002),
            dust_floor: dec!(0.01),
            buy_reserve: dec!(5),
            index_reset_bound: dec!(5000000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl ReconciliationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Plain-text endpoint that echoes the caller's public IP.
    pub identity_url: String,
    /// Upper bound for every REST call and for the WebSocket handshake.
    pub request_timeout_secs: u64,
    /// Pause before re-establishing a dropped market stream.
    pub reconnect_delay_secs: u64,
    pub identity_retry_attempts: u32,
    /// First backoff delay between identity attempts; doubled on every retry.
    pub identity_retry_base_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            identity_url: "http://checkip.amazonaws.com".to_string(),
            request_timeout_secs: 10,
            reconnect_delay_secs: 5,
            identity_retry_attempts: 3,
            identity_retry_base_ms: 500,
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn identity_retry_base(&self) -> Duration {
        Duration::from_millis(self.identity_retry_base_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// When false, orders are only logged by the paper executor.
    pub live_trading_enabled: bool,
}

/// Exchange credentials and endpoints. Usually supplied through
/// `PULSE__API__KEY` / `PULSE__API__SECRET` rather than the file.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub key: String,
    pub secret: String,
    pub rest_url: String,
    pub ws_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            rest_url: "https://api.binance.com".to_string(),
            ws_url: "wss://stream.binance.com:9443".to_string(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("key", &redact(&self.key))
            .field("secret", &redact(&self.secret))
            .field("rest_url", &self.rest_url)
            .field("ws_url", &self.ws_url)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), directory: None }
    }
}

fn default_price_precision() -> u32 {
    8
}

fn default_quantity_precision() -> u32 {
    8
}

impl Config {
    /// The validated trading pair.
    pub fn trading_pair(&self) -> Result<TradingPair, ConfigError> {
        Ok(TradingPair::new(&self.pair.base, &self.pair.quote)?)
    }

    /// Rejects settings that would make the engine misbehave rather than fail loudly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trading_pair()?;

        let s = &self.strategy;
        let fractions = [
            ("strategy.min_gain", s.min_gain),
            ("strategy.max_loss", s.max_loss),
            ("strategy.order_range", s.order_range),
            ("strategy.order_variance", s.order_variance),
        ];
        for (name, value) in fractions {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 0 and 1 (exclusive), got {}",
                    name, value
                )));
            }
        }
        if s.buy_trigger <= s.sell_trigger {
            return Err(ConfigError::ValidationError(format!(
                "strategy.buy_trigger ({}) must be greater than strategy.sell_trigger ({})",
                s.buy_trigger, s.sell_trigger
            )));
        }
        if s.dust_floor < Decimal::ZERO || s.buy_reserve < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "strategy.dust_floor and strategy.buy_reserve must not be negative".to_string(),
            ));
        }
        if s.index_reset_bound <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "strategy.index_reset_bound must be positive".to_string(),
            ));
        }
        if self.reconciliation.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reconciliation.interval_secs must be positive".to_string(),
            ));
        }
        if self.network.request_timeout_secs == 0 || self.network.reconnect_delay_secs == 0 {
            return Err(ConfigError::ValidationError(
                "network timeouts and reconnect delay must be positive".to_string(),
            ));
        }
        if self.network.identity_retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "network.identity_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.trading.live_trading_enabled && (self.api.key.is_empty() || self.api.secret.is_empty()) {
            return Err(ConfigError::ValidationError(
                "live trading requires api.key and api.secret".to_string(),
            ));
        }
        Ok(())
    }
}
