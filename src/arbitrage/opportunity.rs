//! Detected arbitrage opportunities.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::market::Market;
use crate::orderbook::OrderBook;

/// Immutable snapshot of a detected mispricing.
///
/// Owned by the scanner for the duration of one scan cycle; never persisted.
#[derive(Debug, Clone)]
pub struct ArbitrageOpportunity {
    /// Market being traded.
    pub market: Market,
    /// YES outcome book at detection time.
    pub yes_book: OrderBook,
    /// NO outcome book at detection time.
    pub no_book: OrderBook,
    /// Best YES ask price.
    pub yes_ask: Decimal,
    /// Best NO ask price.
    pub no_ask: Decimal,
    /// Gross edge: `1 - (yes_ask + no_ask)`.
    pub gross_edge: Decimal,
    /// Estimated fixed cost for both legs.
    pub estimated_fee: Decimal,
    /// Net profit: `gross_edge * position_size - estimated_fee`.
    pub net_profit: Decimal,
    /// Admitted position size per leg.
    pub position_size: Decimal,
    /// Available top-of-book liquidity.
    pub liquidity: Decimal,
    /// Annualized percentage yield.
    pub apy: Decimal,
    /// Return on invested capital, in percent.
    pub roi: Decimal,
    /// When the opportunity was detected.
    pub detected_at: OffsetDateTime,
}

impl ArbitrageOpportunity {
    /// Combined cost of one YES + NO pair.
    pub fn sum_asks(&self) -> Decimal {
        self.yes_ask + self.no_ask
    }

    /// Whether the trade clears its fixed costs.
    pub fn is_profitable(&self) -> bool {
        self.net_profit > Decimal::ZERO
    }

    /// Heuristic quality score in [0, 100] combining depth and edge
    /// magnitude. Not a probability.
    pub fn confidence_score(&self) -> Decimal {
        let liquidity_score = Decimal::from(50).min(self.liquidity);
        let edge_score = Decimal::from(50).min(self.gross_edge * Decimal::from(1000));
        (liquidity_score + edge_score)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Outcome;
    use rust_decimal_macros::dec;

    fn test_opportunity(edge: Decimal, liquidity: Decimal) -> ArbitrageOpportunity {
        let market = Market {
            id: "m1".to_string(),
            title: "test".to_string(),
            condition_id: "c1".to_string(),
            yes_token_id: "yes".to_string(),
            no_token_id: "no".to_string(),
            end_date: OffsetDateTime::UNIX_EPOCH,
            volume: dec!(1000),
            category: None,
        };
        let sum = Decimal::ONE - edge;
        let yes_ask = sum / Decimal::TWO;
        ArbitrageOpportunity {
            yes_book: OrderBook::empty("yes", Outcome::Yes, OffsetDateTime::UNIX_EPOCH),
            no_book: OrderBook::empty("no", Outcome::No, OffsetDateTime::UNIX_EPOCH),
            market,
            yes_ask,
            no_ask: sum - yes_ask,
            gross_edge: edge,
            estimated_fee: dec!(0.02),
            net_profit: dec!(1),
            position_size: dec!(10),
            liquidity,
            apy: dec!(100),
            roi: dec!(2),
            detected_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn sum_asks_complements_edge() {
        let opp = test_opportunity(dec!(0.02), dec!(100));
        assert_eq!(opp.sum_asks(), dec!(0.98));
        assert_eq!(Decimal::ONE - opp.sum_asks(), opp.gross_edge);
    }

    #[test]
    fn confidence_caps_each_component_at_fifty() {
        // Deep book, huge edge: both components saturate.
        let opp = test_opportunity(dec!(0.10), dec!(500));
        assert_eq!(opp.confidence_score(), dec!(100));

        // Thin book, small edge: 5 + 10 = 15.
        let opp = test_opportunity(dec!(0.01), dec!(5));
        assert_eq!(opp.confidence_score(), dec!(15));
    }
}
