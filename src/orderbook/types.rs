//! Order book types and data structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::market::Outcome;

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level, in the unit interval.
    pub price: Decimal,
    /// Size available at this price, in currency units.
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Notional value of this level.
    pub fn total_value(&self) -> Decimal {
        self.price * self.size
    }
}

/// Snapshot of one outcome token's order book.
///
/// Bids are sorted by price descending, asks ascending. An empty book is a
/// valid snapshot of a market with no resting liquidity.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Token ID this book represents.
    pub token_id: String,
    /// Which outcome the token resolves.
    pub outcome: Outcome,
    /// Bid levels sorted by price descending.
    pub bids: Vec<PriceLevel>,
    /// Ask levels sorted by price ascending.
    pub asks: Vec<PriceLevel>,
    /// When this snapshot was taken.
    pub updated_at: OffsetDateTime,
}

impl OrderBook {
    /// Create an empty book for a token.
    pub fn empty(token_id: impl Into<String>, outcome: Outcome, now: OffsetDateTime) -> Self {
        Self {
            token_id: token_id.into(),
            outcome,
            bids: Vec::new(),
            asks: Vec::new(),
            updated_at: now,
        }
    }

    /// Best bid level (highest price).
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask level (lowest price).
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Best bid price.
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.best_bid().map(|l| l.price)
    }

    /// Best ask price.
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.best_ask().map(|l| l.price)
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Liquidity at the top of the book: the smaller of best-bid size and
    /// best-ask size, bounding the size that can be safely executed.
    pub fn top_of_book_liquidity(&self) -> Decimal {
        let bid_size = self.best_bid().map(|l| l.size).unwrap_or(Decimal::ZERO);
        let ask_size = self.best_ask().map(|l| l.size).unwrap_or(Decimal::ZERO);
        bid_size.min(ask_size)
    }

    /// Whether the book crossed itself (best ask below best bid).
    pub fn is_inverted(&self) -> bool {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => ask < bid,
            _ => false,
        }
    }

    /// Whether the book has no levels on either side.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_book(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> OrderBook {
        OrderBook {
            token_id: "test".to_string(),
            outcome: Outcome::Yes,
            bids: bids.into_iter().map(|(p, s)| PriceLevel::new(p, s)).collect(),
            asks: asks.into_iter().map(|(p, s)| PriceLevel::new(p, s)).collect(),
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn best_prices_and_spread() {
        let book = test_book(
            vec![(dec!(0.48), dec!(50)), (dec!(0.47), dec!(100))],
            vec![(dec!(0.50), dec!(50)), (dec!(0.51), dec!(100))],
        );

        assert_eq!(book.best_bid_price(), Some(dec!(0.48)));
        assert_eq!(book.best_ask_price(), Some(dec!(0.50)));
        assert_eq!(book.spread(), Some(dec!(0.02)));
    }

    #[test]
    fn top_of_book_liquidity_is_min_of_sides() {
        let book = test_book(vec![(dec!(0.48), dec!(30))], vec![(dec!(0.50), dec!(80))]);
        assert_eq!(book.top_of_book_liquidity(), dec!(30));
    }

    #[test]
    fn empty_book_has_no_quotes() {
        let book = OrderBook::empty("t", Outcome::No, OffsetDateTime::UNIX_EPOCH);
        assert!(book.is_empty());
        assert_eq!(book.best_ask_price(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.top_of_book_liquidity(), dec!(0));
    }

    #[test]
    fn detects_inverted_book() {
        let inverted = test_book(vec![(dec!(0.52), dec!(50))], vec![(dec!(0.50), dec!(50))]);
        assert!(inverted.is_inverted());

        let normal = test_book(vec![(dec!(0.48), dec!(50))], vec![(dec!(0.50), dec!(50))]);
        assert!(!normal.is_inverted());
    }
}
