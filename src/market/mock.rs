//! Mock market feed for unit testing.
//!
//! Serves canned markets and order books without network access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::FeedError;
use crate::orderbook::{OrderBook, PriceLevel};

use super::feed::MarketFeed;
use super::types::{Market, Outcome};

/// Behavior switches for the mock feed.
#[derive(Debug, Clone, Default)]
pub struct MockFeedConfig {
    /// Fail all market-listing requests.
    pub fail_listing: bool,
    /// Token ids whose book fetches should fail.
    pub fail_books_for: Vec<String>,
}

/// In-memory [`MarketFeed`] implementation for tests.
#[derive(Debug, Clone, Default)]
pub struct MockMarketFeed {
    config: MockFeedConfig,
    markets: Arc<Mutex<Vec<Market>>>,
    books: Arc<Mutex<HashMap<String, OrderBook>>>,
}

impl MockMarketFeed {
    /// Create an empty mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock feed with custom failure behavior.
    pub fn with_config(config: MockFeedConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register a market to be returned by listing calls.
    pub fn add_market(&self, market: Market) {
        self.markets.lock().unwrap().push(market);
    }

    /// Register an order book for a token.
    pub fn set_order_book(&self, book: OrderBook) {
        self.books
            .lock()
            .unwrap()
            .insert(book.token_id.clone(), book);
    }

    /// Remove all registered markets and books.
    pub fn clear(&self) {
        self.markets.lock().unwrap().clear();
        self.books.lock().unwrap().clear();
    }
}

#[async_trait]
impl MarketFeed for MockMarketFeed {
    async fn list_active_markets(
        &self,
        min_volume: Decimal,
        max_days_to_resolution: i64,
        limit: usize,
    ) -> Result<Vec<Market>, FeedError> {
        if self.config.fail_listing {
            return Err(FeedError::FetchFailed {
                resource: "markets".to_string(),
                reason: "mock listing failure".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let markets = self
            .markets
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.volume >= min_volume
                    && m.days_to_resolution(now) <= max_days_to_resolution
                    && m.is_active(now)
            })
            .take(limit)
            .cloned()
            .collect();

        Ok(markets)
    }

    async fn get_order_book(
        &self,
        token_id: &str,
        outcome: Outcome,
    ) -> Result<OrderBook, FeedError> {
        if self.config.fail_books_for.iter().any(|t| t == token_id) {
            return Err(FeedError::FetchFailed {
                resource: token_id.to_string(),
                reason: "mock book failure".to_string(),
            });
        }

        let books = self.books.lock().unwrap();
        match books.get(token_id) {
            Some(book) => Ok(book.clone()),
            // Unknown tokens get an empty book, matching the real feed's
            // behavior for markets without resting liquidity.
            None => Ok(OrderBook::empty(token_id, outcome, OffsetDateTime::now_utc())),
        }
    }
}

/// Builder for order books with common shapes.
pub struct BookBuilder {
    token_id: String,
    outcome: Outcome,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl BookBuilder {
    /// Start a book for the given token.
    pub fn new(token_id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            token_id: token_id.into(),
            outcome,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Add a bid level.
    pub fn bid(mut self, price: Decimal, size: Decimal) -> Self {
        self.bids.push(PriceLevel::new(price, size));
        self
    }

    /// Add an ask level.
    pub fn ask(mut self, price: Decimal, size: Decimal) -> Self {
        self.asks.push(PriceLevel::new(price, size));
        self
    }

    /// Build the book with levels sorted correctly.
    pub fn build(mut self) -> OrderBook {
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));

        OrderBook {
            token_id: self.token_id,
            outcome: self.outcome,
            bids: self.bids,
            asks: self.asks,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::Duration;

    fn test_market(id: &str, volume: Decimal) -> Market {
        Market {
            id: id.to_string(),
            title: format!("market {id}"),
            condition_id: format!("cond-{id}"),
            yes_token_id: format!("{id}-yes"),
            no_token_id: format!("{id}-no"),
            end_date: OffsetDateTime::now_utc() + Duration::days(5),
            volume,
            category: None,
        }
    }

    #[tokio::test]
    async fn listing_applies_volume_filter() {
        let feed = MockMarketFeed::new();
        feed.add_market(test_market("a", dec!(50)));
        feed.add_market(test_market("b", dec!(500)));

        let markets = feed.list_active_markets(dec!(100), 14, 10).await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].id, "b");
    }

    #[tokio::test]
    async fn unknown_token_gets_empty_book() {
        let feed = MockMarketFeed::new();
        let book = feed.get_order_book("nowhere", Outcome::Yes).await.unwrap();
        assert!(book.is_empty());
    }

    #[tokio::test]
    async fn configured_failures_surface() {
        let feed = MockMarketFeed::with_config(MockFeedConfig {
            fail_listing: true,
            fail_books_for: vec!["bad-token".to_string()],
        });

        assert!(feed.list_active_markets(dec!(0), 14, 10).await.is_err());
        assert!(feed.get_order_book("bad-token", Outcome::No).await.is_err());
    }

    #[test]
    fn book_builder_sorts_levels() {
        let book = BookBuilder::new("tok", Outcome::Yes)
            .bid(dec!(0.49), dec!(200))
            .bid(dec!(0.50), dec!(100))
            .ask(dec!(0.53), dec!(200))
            .ask(dec!(0.52), dec!(100))
            .build();

        assert_eq!(book.best_bid_price(), Some(dec!(0.50)));
        assert_eq!(book.best_ask_price(), Some(dec!(0.52)));
    }
}
