//! Market data feed contract.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::FeedError;
use crate::orderbook::OrderBook;

use super::types::{Market, Outcome};

/// Source of market metadata and order-book snapshots.
///
/// Implementations must return an order book with empty levels, rather than
/// an error, for tokens that currently have no resting liquidity.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// List active markets passing coarse volume and resolution-time filters.
    async fn list_active_markets(
        &self,
        min_volume: Decimal,
        max_days_to_resolution: i64,
        limit: usize,
    ) -> Result<Vec<Market>, FeedError>;

    /// Fetch the current order book for one outcome token.
    async fn get_order_book(&self, token_id: &str, outcome: Outcome)
        -> Result<OrderBook, FeedError>;
}
