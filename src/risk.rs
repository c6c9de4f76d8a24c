//! Risk admission control and exposure limits.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::arbitrage::ArbitrageOpportunity;
use crate::config::Config;
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Reason a candidate trade was denied admission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Denial {
    /// Position size above the per-trade limit.
    #[error("position size ${size} exceeds max trade size ${limit}")]
    TradeSize {
        /// Proposed position size.
        size: Decimal,
        /// Configured limit.
        limit: Decimal,
    },

    /// Daily loss limit already breached.
    #[error("daily loss ${loss} exceeds limit ${limit}")]
    DailyLoss {
        /// Loss accumulated today (positive number).
        loss: Decimal,
        /// Configured limit.
        limit: Decimal,
    },

    /// The trade would push total exposure past the cap.
    #[error("projected exposure ${projected} would exceed limit ${limit}")]
    Exposure {
        /// Exposure after this trade.
        projected: Decimal,
        /// Configured limit.
        limit: Decimal,
    },

    /// Exposure could not be read from the ledger; fail closed.
    #[error("exposure unavailable: {reason}")]
    ExposureUnavailable {
        /// Underlying ledger failure.
        reason: String,
    },

    /// Net profit under the floor.
    #[error("net profit ${profit} below minimum ${minimum}")]
    NetProfit {
        /// Opportunity net profit.
        profit: Decimal,
        /// Configured minimum.
        minimum: Decimal,
    },

    /// APY under the floor.
    #[error("apy {apy}% below minimum {minimum}%")]
    Apy {
        /// Opportunity APY.
        apy: Decimal,
        /// Configured minimum.
        minimum: Decimal,
    },

    /// Market resolves too far in the future.
    #[error("{days} days to resolution exceeds maximum {limit}")]
    ResolutionTooFar {
        /// Days until resolution.
        days: i64,
        /// Configured maximum.
        limit: i64,
    },
}

/// Structural defect found by validation (no I/O involved).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationDefect {
    /// Net profit is zero or negative.
    #[error("non-positive net profit: ${0}")]
    NonPositiveNetProfit(Decimal),

    /// An outcome price is outside the open unit interval.
    #[error("price {price} outside (0, 1)")]
    PriceOutOfRange {
        /// The offending price.
        price: Decimal,
    },

    /// The ask pair no longer sums below one.
    #[error("sum of asks ${0} >= $1.00")]
    SumAtOrAboveOne(Decimal),

    /// Liquidity below the configured floor.
    #[error("insufficient liquidity: ${0}")]
    ThinLiquidity(Decimal),

    /// The market already resolved or stopped trading.
    #[error("market is no longer active")]
    MarketInactive,
}

/// Snapshot of current risk state.
#[derive(Debug, Clone)]
pub struct RiskStats {
    /// Trades executed today.
    pub daily_trades: u32,
    /// PnL accumulated today.
    pub daily_pnl: Decimal,
    /// Open position count.
    pub open_positions: usize,
    /// Sum of open positions' entry cost.
    pub total_exposure: Decimal,
    /// Exposure as a percentage of the cap.
    pub exposure_utilization_pct: Decimal,
    /// Daily loss as a percentage of the limit.
    pub loss_limit_utilization_pct: Decimal,
}

/// Stateful admission control for candidate trades.
///
/// The daily counters are the only state carried across scan cycles. All
/// mutation happens through `&mut self`, so each execution result is folded
/// in atomically with respect to the admission checks that follow it; a
/// future concurrent-trade extension must wrap this in a lock rather than
/// clone it.
pub struct RiskManager {
    config: Arc<Config>,
    ledger: Arc<dyn Ledger>,
    daily_trades: u32,
    daily_pnl: Decimal,
    daily_reset_date: NaiveDate,
}

impl RiskManager {
    /// Create a risk manager reading exposure from the given ledger.
    pub fn new(config: Arc<Config>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            config,
            ledger,
            daily_trades: 0,
            daily_pnl: Decimal::ZERO,
            daily_reset_date: chrono::Local::now().date_naive(),
        }
    }

    fn maybe_reset(&mut self, today: NaiveDate) {
        if today > self.daily_reset_date {
            info!(
                trades = self.daily_trades,
                pnl = %self.daily_pnl,
                "daily counters reset"
            );
            self.daily_trades = 0;
            self.daily_pnl = Decimal::ZERO;
            self.daily_reset_date = today;
        }
    }

    /// Check whether a candidate trade may be executed. Rules run in fixed
    /// order; the first failure denies with its reason.
    pub async fn check_trade_allowed(
        &mut self,
        opportunity: &ArbitrageOpportunity,
    ) -> Result<(), Denial> {
        self.maybe_reset(chrono::Local::now().date_naive());

        if opportunity.position_size > self.config.max_trade_size {
            let denial = Denial::TradeSize {
                size: opportunity.position_size,
                limit: self.config.max_trade_size,
            };
            warn!(%denial, "trade blocked");
            return Err(denial);
        }

        if self.daily_pnl < -self.config.max_daily_loss {
            let denial = Denial::DailyLoss {
                loss: -self.daily_pnl,
                limit: self.config.max_daily_loss,
            };
            warn!(%denial, "trade blocked");
            return Err(denial);
        }

        let total_exposure = match self.total_exposure().await {
            Ok(exposure) => exposure,
            Err(err) => {
                let denial = Denial::ExposureUnavailable {
                    reason: err.to_string(),
                };
                warn!(%denial, "trade blocked");
                return Err(denial);
            }
        };
        let projected = total_exposure + opportunity.position_size * opportunity.sum_asks();
        if projected > self.config.max_open_exposure {
            let denial = Denial::Exposure {
                projected,
                limit: self.config.max_open_exposure,
            };
            warn!(%denial, "trade blocked");
            return Err(denial);
        }

        if opportunity.net_profit < self.config.min_net_profit {
            let denial = Denial::NetProfit {
                profit: opportunity.net_profit,
                minimum: self.config.min_net_profit,
            };
            debug!(%denial, "trade skipped");
            return Err(denial);
        }

        if opportunity.apy < self.config.min_apy {
            let denial = Denial::Apy {
                apy: opportunity.apy,
                minimum: self.config.min_apy,
            };
            debug!(%denial, "trade skipped");
            return Err(denial);
        }

        let days = opportunity
            .market
            .days_to_resolution(opportunity.detected_at);
        if days > self.config.max_days_to_resolution {
            let denial = Denial::ResolutionTooFar {
                days,
                limit: self.config.max_days_to_resolution,
            };
            debug!(%denial, "trade skipped");
            return Err(denial);
        }

        info!(market = %opportunity.market.id, "trade allowed");
        Ok(())
    }

    /// Structural validation of an opportunity; no I/O, no counters.
    pub fn validate_opportunity(
        &self,
        opportunity: &ArbitrageOpportunity,
        now: OffsetDateTime,
    ) -> Result<(), ValidationDefect> {
        if opportunity.net_profit <= Decimal::ZERO {
            return Err(ValidationDefect::NonPositiveNetProfit(
                opportunity.net_profit,
            ));
        }

        for price in [opportunity.yes_ask, opportunity.no_ask] {
            if price <= Decimal::ZERO || price >= Decimal::ONE {
                return Err(ValidationDefect::PriceOutOfRange { price });
            }
        }

        if opportunity.sum_asks() >= Decimal::ONE {
            return Err(ValidationDefect::SumAtOrAboveOne(opportunity.sum_asks()));
        }

        if opportunity.liquidity < self.config.min_liquidity {
            return Err(ValidationDefect::ThinLiquidity(opportunity.liquidity));
        }

        if !opportunity.market.is_active(now) {
            return Err(ValidationDefect::MarketInactive);
        }

        Ok(())
    }

    /// Fold an execution result into the daily counters.
    pub fn record_trade_result(&mut self, net_pnl: Decimal) {
        self.maybe_reset(chrono::Local::now().date_naive());

        self.daily_trades += 1;
        self.daily_pnl += net_pnl;

        info!(
            pnl = %net_pnl,
            daily_trades = self.daily_trades,
            daily_pnl = %self.daily_pnl,
            "trade result recorded"
        );

        if self.daily_pnl < -self.config.max_daily_loss {
            warn!(
                daily_pnl = %self.daily_pnl,
                limit = %self.config.max_daily_loss,
                "daily loss limit reached"
            );
        }
    }

    /// Emergency stop: daily loss limit breached or exposure utilization
    /// above 95%. Callers must halt new trade submission while this returns
    /// a reason; existing orders are left alone.
    pub async fn emergency_stop(&mut self) -> Result<Option<String>, LedgerError> {
        self.maybe_reset(chrono::Local::now().date_naive());

        if self.daily_pnl < -self.config.max_daily_loss {
            return Ok(Some(format!(
                "daily loss limit reached: ${} / ${}",
                -self.daily_pnl,
                self.config.max_daily_loss
            )));
        }

        let stats = self.risk_stats().await?;
        if stats.exposure_utilization_pct > Decimal::from(95) {
            return Ok(Some(format!(
                "exposure critically high: {}% (${} / ${})",
                stats.exposure_utilization_pct.round_dp(1),
                stats.total_exposure,
                self.config.max_open_exposure
            )));
        }

        Ok(None)
    }

    /// Current risk metrics.
    pub async fn risk_stats(&self) -> Result<RiskStats, LedgerError> {
        let open_positions = self.ledger.get_open_positions().await?;
        let total_exposure: Decimal = open_positions.iter().map(|p| p.total_cost).sum();

        let exposure_utilization_pct = if self.config.max_open_exposure > Decimal::ZERO {
            total_exposure / self.config.max_open_exposure * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let loss_limit_utilization_pct =
            if self.daily_pnl < Decimal::ZERO && self.config.max_daily_loss > Decimal::ZERO {
                -self.daily_pnl / self.config.max_daily_loss * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };

        Ok(RiskStats {
            daily_trades: self.daily_trades,
            daily_pnl: self.daily_pnl,
            open_positions: open_positions.len(),
            total_exposure,
            exposure_utilization_pct,
            loss_limit_utilization_pct,
        })
    }

    async fn total_exposure(&self) -> Result<Decimal, LedgerError> {
        let positions = self.ledger.get_open_positions().await?;
        Ok(positions.iter().map(|p| p.total_cost).sum())
    }

    #[cfg(test)]
    pub(crate) fn set_daily_state(&mut self, trades: u32, pnl: Decimal, date: NaiveDate) {
        self.daily_trades = trades;
        self.daily_pnl = pnl;
        self.daily_reset_date = date;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::market::{BookBuilder, Market, Outcome};
    use crate::trading::Position;
    use rust_decimal_macros::dec;
    use time::Duration;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            max_trade_size: dec!(15),
            max_daily_loss: dec!(10),
            max_open_exposure: dec!(50),
            min_net_profit: dec!(0.10),
            min_apy: dec!(50),
            min_liquidity: dec!(10),
            max_days_to_resolution: 14,
            ..Config::default()
        })
    }

    fn opportunity_with(size: Decimal, days_out: i64) -> ArbitrageOpportunity {
        let now = OffsetDateTime::now_utc();
        let market = Market {
            id: "m1".to_string(),
            title: "test".to_string(),
            condition_id: "c1".to_string(),
            yes_token_id: "yes".to_string(),
            no_token_id: "no".to_string(),
            end_date: now + Duration::days(days_out),
            volume: dec!(1000),
            category: None,
        };
        ArbitrageOpportunity {
            yes_book: BookBuilder::new("yes", Outcome::Yes).build(),
            no_book: BookBuilder::new("no", Outcome::No).build(),
            market,
            yes_ask: dec!(0.48),
            no_ask: dec!(0.50),
            gross_edge: dec!(0.02),
            estimated_fee: dec!(0.02),
            net_profit: dec!(0.18),
            position_size: size,
            liquidity: dec!(100),
            apy: dec!(365),
            roi: dec!(1.8),
            detected_at: now,
        }
    }

    fn manager() -> RiskManager {
        RiskManager::new(test_config(), Arc::new(MemoryLedger::new()))
    }

    fn manager_with_ledger(ledger: Arc<MemoryLedger>) -> RiskManager {
        RiskManager::new(test_config(), ledger)
    }

    #[tokio::test]
    async fn allows_trade_within_limits() {
        let mut risk = manager();
        assert!(risk
            .check_trade_allowed(&opportunity_with(dec!(10), 2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn denies_oversized_trade_citing_trade_size() {
        let config = Arc::new(Config {
            max_trade_size: dec!(10),
            ..(*test_config()).clone()
        });
        let mut risk = RiskManager::new(config, Arc::new(MemoryLedger::new()));

        let denial = risk
            .check_trade_allowed(&opportunity_with(dec!(20), 2))
            .await
            .unwrap_err();

        assert!(matches!(denial, Denial::TradeSize { .. }));
        assert!(denial.to_string().contains("trade size"));
    }

    #[tokio::test]
    async fn denies_after_daily_loss_limit() {
        let mut risk = manager();
        risk.record_trade_result(dec!(-11));

        let denial = risk
            .check_trade_allowed(&opportunity_with(dec!(10), 2))
            .await
            .unwrap_err();
        assert!(matches!(denial, Denial::DailyLoss { .. }));
    }

    #[tokio::test]
    async fn denies_when_exposure_would_exceed_cap() {
        let ledger = Arc::new(MemoryLedger::new());
        // 45 already at work; 10 * 0.98 more breaks the $50 cap.
        ledger
            .save_position(&Position::open(
                "m0",
                "tok",
                Outcome::Yes,
                dec!(90),
                dec!(0.50),
                OffsetDateTime::now_utc(),
            ))
            .await
            .unwrap();

        let mut risk = manager_with_ledger(ledger);
        let denial = risk
            .check_trade_allowed(&opportunity_with(dec!(10), 2))
            .await
            .unwrap_err();
        assert!(matches!(denial, Denial::Exposure { .. }));
    }

    #[tokio::test]
    async fn admission_is_monotonic_in_each_threshold() {
        let base = opportunity_with(dec!(10), 2);
        assert!(manager().check_trade_allowed(&base).await.is_ok());

        // Tightening any one threshold can only flip allowed -> denied.
        let tighter = [
            Config {
                max_trade_size: dec!(5),
                ..(*test_config()).clone()
            },
            Config {
                min_net_profit: dec!(1),
                ..(*test_config()).clone()
            },
            Config {
                min_apy: dec!(1000),
                ..(*test_config()).clone()
            },
            Config {
                max_days_to_resolution: 1,
                ..(*test_config()).clone()
            },
        ];

        for config in tighter {
            let mut risk = RiskManager::new(Arc::new(config), Arc::new(MemoryLedger::new()));
            assert!(risk.check_trade_allowed(&base).await.is_err());
        }
    }

    #[tokio::test]
    async fn daily_counters_reset_on_new_day() {
        let mut risk = manager();
        let yesterday = chrono::Local::now().date_naive() - chrono::Days::new(1);
        risk.set_daily_state(5, dec!(-11), yesterday);

        // The new day clears the breach.
        assert!(risk
            .check_trade_allowed(&opportunity_with(dec!(10), 2))
            .await
            .is_ok());
        let stats = risk.risk_stats().await.unwrap();
        assert_eq!(stats.daily_trades, 0);
        assert_eq!(stats.daily_pnl, dec!(0));
    }

    #[test]
    fn validation_rejects_structural_defects() {
        let risk = manager();
        let now = OffsetDateTime::now_utc();

        let good = opportunity_with(dec!(10), 2);
        assert!(risk.validate_opportunity(&good, now).is_ok());

        let mut negative = good.clone();
        negative.net_profit = dec!(-0.5);
        assert_eq!(
            risk.validate_opportunity(&negative, now),
            Err(ValidationDefect::NonPositiveNetProfit(dec!(-0.5)))
        );

        let mut bad_price = good.clone();
        bad_price.yes_ask = dec!(1.2);
        assert!(matches!(
            risk.validate_opportunity(&bad_price, now),
            Err(ValidationDefect::PriceOutOfRange { .. })
        ));

        let mut crossed = good.clone();
        crossed.yes_ask = dec!(0.52);
        assert!(matches!(
            risk.validate_opportunity(&crossed, now),
            Err(ValidationDefect::SumAtOrAboveOne(_))
        ));

        let mut thin = good.clone();
        thin.liquidity = dec!(1);
        assert_eq!(
            risk.validate_opportunity(&thin, now),
            Err(ValidationDefect::ThinLiquidity(dec!(1)))
        );

        let mut resolved = good.clone();
        resolved.market.end_date = now - Duration::days(1);
        assert_eq!(
            risk.validate_opportunity(&resolved, now),
            Err(ValidationDefect::MarketInactive)
        );
    }

    #[tokio::test]
    async fn emergency_stop_on_daily_loss() {
        let mut risk = manager();
        assert!(risk.emergency_stop().await.unwrap().is_none());

        risk.record_trade_result(dec!(-11));
        let reason = risk.emergency_stop().await.unwrap().unwrap();
        assert!(reason.contains("daily loss"));
    }

    #[tokio::test]
    async fn emergency_stop_on_exposure_utilization() {
        let ledger = Arc::new(MemoryLedger::new());
        // $48 of $50: 96% utilization.
        ledger
            .save_position(&Position::open(
                "m0",
                "tok",
                Outcome::Yes,
                dec!(96),
                dec!(0.50),
                OffsetDateTime::now_utc(),
            ))
            .await
            .unwrap();

        let mut risk = manager_with_ledger(ledger);
        let reason = risk.emergency_stop().await.unwrap().unwrap();
        assert!(reason.contains("exposure"));
    }
}
