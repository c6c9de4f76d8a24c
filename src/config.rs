//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Constructed once at startup and passed by reference (or `Arc`) into the
/// scanner, risk manager, and executor. No component reads the environment
/// after this point.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Opportunity Thresholds ===
    /// Minimum gross edge per dollar (0.01 = 1%).
    #[serde(default = "default_min_gross_edge")]
    pub min_gross_edge: Decimal,

    /// Minimum net profit per trade after fees.
    #[serde(default = "default_min_net_profit")]
    pub min_net_profit: Decimal,

    /// Minimum top-of-book liquidity in currency units.
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: Decimal,

    /// Maximum days until market resolution.
    #[serde(default = "default_max_days_to_resolution")]
    pub max_days_to_resolution: i64,

    /// Minimum annualized yield percentage.
    #[serde(default = "default_min_apy")]
    pub min_apy: Decimal,

    /// Estimated fixed cost per executed leg (gas/fees).
    #[serde(default = "default_fee_per_leg")]
    pub estimated_fee_per_leg: Decimal,

    // === Risk Limits ===
    /// Maximum size of a single trade in currency units.
    #[serde(default = "default_max_trade_size")]
    pub max_trade_size: Decimal,

    /// Maximum loss allowed per local calendar day.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,

    /// Maximum total open exposure across positions.
    #[serde(default = "default_max_open_exposure")]
    pub max_open_exposure: Decimal,

    // === Execution ===
    /// Hard wall-clock timeout for both legs to fill.
    #[serde(default = "default_order_timeout_seconds")]
    pub order_timeout_seconds: u64,

    /// Interval between fill-status polls in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Sell back a one-sided fill instead of holding it.
    #[serde(default = "default_true")]
    pub partial_fill_unwind: bool,

    /// Seconds to wait after placing an unwind sell before re-checking its
    /// fill. A single grace sleep, not a poll loop.
    #[serde(default = "default_unwind_grace_seconds")]
    pub unwind_grace_seconds: u64,

    // === Scanning ===
    /// Seconds between scan cycles.
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,

    /// Stagger between order-book fetch launches across markets, to stay
    /// under the venue rate limiter.
    #[serde(default = "default_fetch_pacing_ms")]
    pub fetch_pacing_ms: u64,

    /// Minimum market volume to bother scanning.
    #[serde(default = "default_min_volume")]
    pub min_volume: Decimal,

    /// Maximum number of markets fetched per scan cycle.
    #[serde(default = "default_market_scan_limit")]
    pub market_scan_limit: usize,

    // === Operation Modes ===
    /// Simulation mode: detect and admit but never submit orders.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    // === Endpoints ===
    /// Market metadata API base URL.
    #[serde(default = "default_gamma_url")]
    pub gamma_api_url: String,

    /// CLOB API base URL (order books and orders).
    #[serde(default = "default_clob_url")]
    pub clob_api_url: String,

    // === HTTP ===
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Retry attempts for idempotent GET requests.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Fixed backoff between retries in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // === Circuit Breaker ===
    /// Consecutive gateway failures before new executions are halted.
    #[serde(default = "default_max_gateway_failures")]
    pub max_consecutive_gateway_failures: u32,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_min_gross_edge() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_min_net_profit() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_min_liquidity() -> Decimal {
    Decimal::new(10, 0)
}

fn default_max_days_to_resolution() -> i64 {
    14
}

fn default_min_apy() -> Decimal {
    Decimal::new(50, 0)
}

fn default_fee_per_leg() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_max_trade_size() -> Decimal {
    Decimal::new(15, 0)
}

fn default_max_daily_loss() -> Decimal {
    Decimal::new(10, 0)
}

fn default_max_open_exposure() -> Decimal {
    Decimal::new(50, 0)
}

fn default_order_timeout_seconds() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_unwind_grace_seconds() -> u64 {
    2
}

fn default_scan_interval_seconds() -> u64 {
    3
}

fn default_fetch_pacing_ms() -> u64 {
    50
}

fn default_min_volume() -> Decimal {
    Decimal::new(100, 0)
}

fn default_market_scan_limit() -> usize {
    100
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_http_timeout_ms() -> u64 {
    2000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_max_gateway_failures() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_gross_edge <= Decimal::ZERO || self.min_gross_edge >= Decimal::ONE {
            return Err("MIN_GROSS_EDGE must be in (0, 1)".to_string());
        }
        if self.max_trade_size <= Decimal::ZERO {
            return Err("MAX_TRADE_SIZE must be positive".to_string());
        }
        if self.max_open_exposure < self.max_trade_size {
            return Err("MAX_OPEN_EXPOSURE must be at least MAX_TRADE_SIZE".to_string());
        }
        if self.order_timeout_seconds == 0 {
            return Err("ORDER_TIMEOUT_SECONDS must be positive".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("POLL_INTERVAL_MS must be positive".to_string());
        }
        if self.max_days_to_resolution <= 0 {
            return Err("MAX_DAYS_TO_RESOLUTION must be positive".to_string());
        }
        Ok(())
    }

    /// Hard timeout for both legs of an execution.
    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.order_timeout_seconds)
    }

    /// Interval between fill-status polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Grace period before the unwind fill re-check.
    pub fn unwind_grace(&self) -> Duration {
        Duration::from_secs(self.unwind_grace_seconds)
    }

    /// Pause between scan cycles.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }

    /// Stagger between order-book fetch launches.
    pub fn fetch_pacing(&self) -> Duration {
        Duration::from_millis(self.fetch_pacing_ms)
    }

    /// Estimated fixed cost of a full two-leg execution.
    pub fn estimated_fee_per_trade(&self) -> Decimal {
        self.estimated_fee_per_leg * Decimal::TWO
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_gross_edge: default_min_gross_edge(),
            min_net_profit: default_min_net_profit(),
            min_liquidity: default_min_liquidity(),
            max_days_to_resolution: default_max_days_to_resolution(),
            min_apy: default_min_apy(),
            estimated_fee_per_leg: default_fee_per_leg(),
            max_trade_size: default_max_trade_size(),
            max_daily_loss: default_max_daily_loss(),
            max_open_exposure: default_max_open_exposure(),
            order_timeout_seconds: default_order_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            partial_fill_unwind: default_true(),
            unwind_grace_seconds: default_unwind_grace_seconds(),
            scan_interval_seconds: default_scan_interval_seconds(),
            fetch_pacing_ms: default_fetch_pacing_ms(),
            min_volume: default_min_volume(),
            market_scan_limit: default_market_scan_limit(),
            dry_run: default_true(),
            gamma_api_url: default_gamma_url(),
            clob_api_url: default_clob_url(),
            http_timeout_ms: default_http_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_consecutive_gateway_failures: default_max_gateway_failures(),
            rust_log: default_log_level(),
        }
    }
}
