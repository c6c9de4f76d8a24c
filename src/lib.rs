//! Prediction market arbitrage scanner and execution engine.
//!
//! Binary-outcome markets resolve with exactly one winning token paying
//! $1.00. When the best YES ask plus the best NO ask is below $1.00, buying
//! both sides locks in the difference regardless of outcome:
//!
//! ```text
//! YES ask:  $0.48
//! NO ask:   $0.50
//! ─────────────────
//! Total:    $0.98 < $1.00
//! Edge:     $0.02 per pair, guaranteed at resolution
//! ```
//!
//! The engine scans markets for such mispricings, sizes each trade against
//! top-of-book liquidity and configured limits, runs the candidate through
//! risk admission, and executes both legs with bounded-time fill monitoring.
//! A one-sided fill is compensated by selling the filled leg back (unwind).
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Market/outcome types and the market feed
//! - [`orderbook`]: Order book snapshots and derived quantities
//! - [`arbitrage`]: Opportunity detection and scanning
//! - [`trading`]: Orders, positions, gateway, and the execution engine
//! - [`risk`]: Admission control and exposure limits
//! - [`ledger`]: Order/position/PnL persistence seam
//! - [`circuit`]: Execution circuit breaker
//! - [`retry`]: Retry policy for idempotent network calls
//! - [`metrics`]: Metric registration and helpers

pub mod arbitrage;
pub mod circuit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod retry;
pub mod risk;
pub mod trading;

pub use config::Config;
pub use error::{ArbError, Result};
