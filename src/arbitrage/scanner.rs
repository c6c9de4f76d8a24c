//! Concurrent market scanning and opportunity ranking.

use std::sync::Arc;

use futures::future::join_all;
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::market::{Market, MarketFeed, Outcome};
use crate::metrics;
use crate::orderbook::OrderBook;

use super::detector::detect_arbitrage;
use super::opportunity::ArbitrageOpportunity;

/// Turns the market universe into a ranked opportunity list each cycle.
pub struct Scanner {
    config: Arc<Config>,
    feed: Arc<dyn MarketFeed>,
}

impl Scanner {
    /// Create a scanner over the given feed.
    pub fn new(config: Arc<Config>, feed: Arc<dyn MarketFeed>) -> Self {
        Self { config, feed }
    }

    /// Fetch both outcome books for a market concurrently.
    async fn fetch_market_books(&self, market: &Market) -> Option<(OrderBook, OrderBook)> {
        let (yes, no) = tokio::join!(
            self.feed.get_order_book(&market.yes_token_id, Outcome::Yes),
            self.feed.get_order_book(&market.no_token_id, Outcome::No),
        );

        match (yes, no) {
            (Ok(yes), Ok(no)) => Some((yes, no)),
            (Err(err), _) | (_, Err(err)) => {
                warn!(market = %market.id, error = %err, "failed to fetch order books");
                None
            }
        }
    }

    /// Scan a single market. Fetch or evaluation failures yield `None`.
    async fn scan_market(&self, market: &Market, now: OffsetDateTime) -> Option<ArbitrageOpportunity> {
        let (yes_book, no_book) = self.fetch_market_books(market).await?;
        detect_arbitrage(market, &yes_book, &no_book, &self.config, now)
    }

    /// Scan all active markets and return opportunities ranked best-first.
    ///
    /// Book fetches across markets run concurrently; each launch is staggered
    /// by `fetch_pacing` to stay under the venue rate limiter. One market's
    /// failure never aborts the cycle. An empty result is a valid outcome.
    #[instrument(skip(self))]
    pub async fn scan_and_rank(&self) -> Vec<ArbitrageOpportunity> {
        let started = std::time::Instant::now();
        let markets = match self
            .feed
            .list_active_markets(
                self.config.min_volume,
                self.config.max_days_to_resolution,
                self.config.market_scan_limit,
            )
            .await
        {
            Ok(markets) => markets,
            Err(err) => {
                warn!(error = %err, "failed to list active markets");
                return Vec::new();
            }
        };

        if markets.is_empty() {
            debug!("no markets to scan");
            return Vec::new();
        }

        info!(count = markets.len(), "scanning markets");
        let now = OffsetDateTime::now_utc();
        let pacing = self.config.fetch_pacing();

        let scans = markets.iter().enumerate().map(|(i, market)| async move {
            sleep(pacing * i as u32).await;
            self.scan_market(market, now).await
        });

        let mut opportunities: Vec<ArbitrageOpportunity> =
            join_all(scans).await.into_iter().flatten().collect();

        rank_opportunities(&mut opportunities);
        metrics::record_scan(started, markets.len(), opportunities.len());

        if let Some(top) = opportunities.first() {
            info!(
                count = opportunities.len(),
                top_market = %top.market.id,
                top_apy = %top.apy,
                top_net_profit = %top.net_profit,
                "scan complete"
            );
        } else {
            debug!("no arbitrage opportunities found");
        }

        opportunities
    }
}

/// Rank opportunities best-first: APY desc, then net profit desc, then
/// liquidity desc. The sort is stable, so ties keep their original order and
/// re-ranking an already-ranked list is a no-op.
pub fn rank_opportunities(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.apy
            .cmp(&a.apy)
            .then_with(|| b.net_profit.cmp(&a.net_profit))
            .then_with(|| b.liquidity.cmp(&a.liquidity))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{BookBuilder, MockFeedConfig, MockMarketFeed};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::Duration;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            min_gross_edge: dec!(0.01),
            min_net_profit: dec!(0.10),
            min_liquidity: dec!(10),
            min_apy: dec!(50),
            max_trade_size: dec!(100),
            estimated_fee_per_leg: dec!(0.01),
            fetch_pacing_ms: 0,
            ..Config::default()
        })
    }

    fn test_market(id: &str) -> Market {
        Market {
            id: id.to_string(),
            title: format!("market {id}"),
            condition_id: format!("cond-{id}"),
            yes_token_id: format!("{id}-yes"),
            no_token_id: format!("{id}-no"),
            end_date: OffsetDateTime::now_utc() + Duration::days(2),
            volume: dec!(1000),
            category: None,
        }
    }

    fn seed_market(feed: &MockMarketFeed, id: &str, yes_ask: Decimal, no_ask: Decimal) {
        let market = test_market(id);
        feed.set_order_book(
            BookBuilder::new(market.yes_token_id.clone(), Outcome::Yes)
                .ask(yes_ask, dec!(100))
                .build(),
        );
        feed.set_order_book(
            BookBuilder::new(market.no_token_id.clone(), Outcome::No)
                .ask(no_ask, dec!(100))
                .build(),
        );
        feed.add_market(market);
    }

    fn opportunity(apy: Decimal, net_profit: Decimal, liquidity: Decimal, id: &str) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            market: test_market(id),
            yes_book: BookBuilder::new("y", Outcome::Yes).build(),
            no_book: BookBuilder::new("n", Outcome::No).build(),
            yes_ask: dec!(0.48),
            no_ask: dec!(0.50),
            gross_edge: dec!(0.02),
            estimated_fee: dec!(0.02),
            net_profit,
            position_size: dec!(10),
            liquidity,
            apy,
            roi: dec!(1),
            detected_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn finds_and_ranks_opportunities() {
        let feed = Arc::new(MockMarketFeed::new());
        // Market "wide" has a 4-cent edge, "narrow" 2 cents.
        seed_market(&feed, "narrow", dec!(0.48), dec!(0.50));
        seed_market(&feed, "wide", dec!(0.46), dec!(0.50));
        seed_market(&feed, "none", dec!(0.55), dec!(0.55));

        let scanner = Scanner::new(test_config(), feed);
        let ranked = scanner.scan_and_rank().await;

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].market.id, "wide");
        assert_eq!(ranked[1].market.id, "narrow");
    }

    #[tokio::test]
    async fn one_failing_market_does_not_abort_scan() {
        let market_bad = test_market("bad");
        let feed = Arc::new(MockMarketFeed::with_config(MockFeedConfig {
            fail_listing: false,
            fail_books_for: vec![market_bad.yes_token_id.clone()],
        }));
        feed.add_market(market_bad);
        seed_market(&feed, "good", dec!(0.48), dec!(0.50));

        let scanner = Scanner::new(test_config(), feed);
        let ranked = scanner.scan_and_rank().await;

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].market.id, "good");
    }

    #[tokio::test]
    async fn empty_universe_is_not_an_error() {
        let feed = Arc::new(MockMarketFeed::new());
        let scanner = Scanner::new(test_config(), feed);
        assert!(scanner.scan_and_rank().await.is_empty());
    }

    #[test]
    fn ranking_uses_three_keys_in_order() {
        let mut opportunities = vec![
            opportunity(dec!(100), dec!(1), dec!(10), "a"),
            opportunity(dec!(200), dec!(1), dec!(10), "b"),
            opportunity(dec!(100), dec!(2), dec!(10), "c"),
            opportunity(dec!(100), dec!(2), dec!(50), "d"),
        ];

        rank_opportunities(&mut opportunities);

        let ids: Vec<&str> = opportunities.iter().map(|o| o.market.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn ranking_is_stable_and_idempotent() {
        let mut opportunities = vec![
            opportunity(dec!(100), dec!(1), dec!(10), "first"),
            opportunity(dec!(100), dec!(1), dec!(10), "second"),
            opportunity(dec!(100), dec!(1), dec!(10), "third"),
        ];

        rank_opportunities(&mut opportunities);
        let once: Vec<String> = opportunities.iter().map(|o| o.market.id.clone()).collect();
        assert_eq!(once, vec!["first", "second", "third"]);

        rank_opportunities(&mut opportunities);
        let twice: Vec<String> = opportunities.iter().map(|o| o.market.id.clone()).collect();
        assert_eq!(once, twice);
    }
}
