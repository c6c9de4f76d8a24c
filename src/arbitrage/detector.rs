//! Pure arbitrage opportunity evaluation.

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config::Config;
use crate::market::Market;
use crate::orderbook::OrderBook;

use super::opportunity::ArbitrageOpportunity;

/// Evaluate a market's current books for a viable long arbitrage
/// (YES ask + NO ask < 1.00).
///
/// Pure and deterministic: the detection timestamp is the `now` argument and
/// nothing else is read from the environment. Every threshold check is
/// all-or-nothing; a failing check yields `None`, not an error.
pub fn detect_arbitrage(
    market: &Market,
    yes_book: &OrderBook,
    no_book: &OrderBook,
    config: &Config,
    now: OffsetDateTime,
) -> Option<ArbitrageOpportunity> {
    let yes_level = yes_book.best_ask()?;
    let no_level = no_book.best_ask()?;

    let yes_ask = yes_level.price;
    let no_ask = no_level.price;
    let sum_asks = yes_ask + no_ask;

    if sum_asks >= Decimal::ONE {
        return None;
    }

    let gross_edge = Decimal::ONE - sum_asks;
    if gross_edge < config.min_gross_edge {
        debug!(market = %market.id, edge = %gross_edge, "edge below threshold");
        return None;
    }

    let liquidity = yes_level.size.min(no_level.size);
    if liquidity < config.min_liquidity {
        debug!(market = %market.id, liquidity = %liquidity, "liquidity below threshold");
        return None;
    }

    let position_size = liquidity.min(config.max_trade_size);

    let estimated_fee = config.estimated_fee_per_trade();
    let net_profit = gross_edge * position_size - estimated_fee;
    if net_profit < config.min_net_profit {
        debug!(market = %market.id, net_profit = %net_profit, "net profit below threshold");
        return None;
    }

    let days = market.days_to_resolution(now).max(1);
    let apy = gross_edge / Decimal::from(days) * Decimal::from(365) * Decimal::ONE_HUNDRED;
    if apy < config.min_apy {
        debug!(market = %market.id, apy = %apy, "apy below threshold");
        return None;
    }

    let total_cost = sum_asks * position_size;
    let roi = if total_cost > Decimal::ZERO {
        net_profit / total_cost * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    info!(
        market = %market.id,
        edge = %gross_edge,
        net_profit = %net_profit,
        apy = %apy,
        "arbitrage opportunity detected"
    );

    Some(ArbitrageOpportunity {
        market: market.clone(),
        yes_book: yes_book.clone(),
        no_book: no_book.clone(),
        yes_ask,
        no_ask,
        gross_edge,
        estimated_fee,
        net_profit,
        position_size,
        liquidity,
        apy,
        roi,
        detected_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{BookBuilder, Outcome};
    use rust_decimal_macros::dec;
    use time::Duration;

    fn test_config() -> Config {
        Config {
            min_gross_edge: dec!(0.01),
            min_net_profit: dec!(0.10),
            min_liquidity: dec!(10),
            max_days_to_resolution: 14,
            min_apy: dec!(50),
            estimated_fee_per_leg: dec!(0.01),
            max_trade_size: dec!(100),
            ..Config::default()
        }
    }

    fn market_resolving_in(days: i64, now: OffsetDateTime) -> Market {
        Market {
            id: "m1".to_string(),
            title: "test market".to_string(),
            condition_id: "c1".to_string(),
            yes_token_id: "yes".to_string(),
            no_token_id: "no".to_string(),
            end_date: now + Duration::days(days),
            volume: dec!(1000),
            category: None,
        }
    }

    fn ask_book(token: &str, outcome: Outcome, price: Decimal, size: Decimal) -> OrderBook {
        BookBuilder::new(token, outcome).ask(price, size).build()
    }

    #[test]
    fn detects_opportunity_with_exact_economics() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.48), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        let opp = detect_arbitrage(&market, &yes, &no, &config, now).unwrap();

        assert_eq!(opp.sum_asks(), dec!(0.98));
        assert_eq!(opp.gross_edge, dec!(0.02));
        assert_eq!(opp.position_size, dec!(100));
        // 0.02 * 100 - 0.02 = 1.98
        assert_eq!(opp.net_profit, dec!(1.98));
        assert_eq!(opp.net_profit, opp.gross_edge * opp.position_size - opp.estimated_fee);
        assert_eq!(opp.detected_at, now);
    }

    #[test]
    fn rejects_when_sum_at_or_above_one() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.51), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        // 0.51 + 0.50 = 1.01 >= 1
        assert!(detect_arbitrage(&market, &yes, &no, &config, now).is_none());
    }

    #[test]
    fn rejects_missing_ask() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.40), dec!(100));
        let no = OrderBook::empty("no", Outcome::No, now);

        assert!(detect_arbitrage(&market, &yes, &no, &config, now).is_none());
    }

    #[test]
    fn rejects_edge_below_minimum() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.497), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.498), dec!(100));

        // Edge 0.005 < 0.01 minimum.
        assert!(detect_arbitrage(&market, &yes, &no, &config, now).is_none());
    }

    #[test]
    fn rejects_thin_liquidity() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.48), dec!(5));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        // min(5, 100) = 5 < 10 minimum.
        assert!(detect_arbitrage(&market, &yes, &no, &config, now).is_none());
    }

    #[test]
    fn caps_size_at_max_trade_size() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = Config {
            max_trade_size: dec!(25),
            ..test_config()
        };
        let market = market_resolving_in(2, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.48), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        let opp = detect_arbitrage(&market, &yes, &no, &config, now).unwrap();
        assert_eq!(opp.position_size, dec!(25));
        assert_eq!(opp.liquidity, dec!(100));
    }

    #[test]
    fn rejects_low_apy_for_distant_resolution() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        // Edge 0.02 over 365 days: APY = 0.02/365*365*100 = 2% < 50%.
        let market = market_resolving_in(365, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.48), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        assert!(detect_arbitrage(&market, &yes, &no, &config, now).is_none());
    }

    #[test]
    fn apy_uses_floor_of_one_day() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let config = test_config();
        // Resolves within hours: days_to_resolution = 0, floored to 1.
        let market = market_resolving_in(0, now);
        let yes = ask_book("yes", Outcome::Yes, dec!(0.48), dec!(100));
        let no = ask_book("no", Outcome::No, dec!(0.50), dec!(100));

        let opp = detect_arbitrage(&market, &yes, &no, &config, now).unwrap();
        // 0.02 / 1 * 365 * 100 = 730%
        assert_eq!(opp.apy, dec!(730));
    }
}
