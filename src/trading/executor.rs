//! Two-leg arbitrage execution state machine.
//!
//! Lifecycle: both legs are submitted concurrently; the attempt only starts
//! once both are acknowledged. Fills are polled under a hard timeout, then
//! unfilled legs are cancelled exactly once. A one-sided fill is compensated
//! by selling the filled leg back at the best bid (unwind) when enabled.

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::arbitrage::ArbitrageOpportunity;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::market::{MarketFeed, Outcome};
use crate::metrics;

use super::gateway::OrderGateway;
use super::order::{Order, Side, TradePair};
use super::position::{PnLEntry, Position};

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Both legs filled; the arbitrage is locked in.
    FullyFilled,
    /// Exactly one leg filled and the exposure is still open.
    PartiallyFilled,
    /// One leg filled, and the compensating sell also filled.
    Unwound,
    /// One leg filled and the compensating sell did not complete. Standing
    /// risk requiring operator attention.
    UnwindFailed,
    /// Neither leg filled before the timeout; everything cancelled.
    TimedOut,
    /// Submission failed; any placed leg was cancelled.
    Failed,
}

impl ExecutionOutcome {
    /// Whether the attempt left exposure that is not hedged by the paired
    /// leg.
    pub fn leaves_open_exposure(&self) -> bool {
        matches!(
            self,
            ExecutionOutcome::PartiallyFilled | ExecutionOutcome::UnwindFailed
        )
    }
}

/// Result of one execution attempt.
#[derive(Debug)]
pub struct ExecutionReport {
    /// Terminal state reached.
    pub outcome: ExecutionOutcome,
    /// The trade pair, when both submissions were acknowledged.
    pub pair: Option<TradePair>,
    /// Realized PnL, known only for round trips closed immediately (unwind).
    pub realized_pnl: Option<Decimal>,
}

impl ExecutionReport {
    fn terminal(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            pair: None,
            realized_pnl: None,
        }
    }
}

/// Executes admitted opportunities against the order gateway.
pub struct Executor {
    config: Arc<Config>,
    gateway: Arc<dyn OrderGateway>,
    feed: Arc<dyn MarketFeed>,
    ledger: Arc<dyn Ledger>,
}

impl Executor {
    /// Create an executor over the given collaborators.
    pub fn new(
        config: Arc<Config>,
        gateway: Arc<dyn OrderGateway>,
        feed: Arc<dyn MarketFeed>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            config,
            gateway,
            feed,
            ledger,
        }
    }

    /// Execute both legs of an opportunity.
    ///
    /// Never returns an error: gateway failures terminate the attempt in the
    /// `Failed` state with already-placed legs cancelled, so no one-sided
    /// submission is ever left live.
    #[instrument(skip(self, opportunity), fields(market = %opportunity.market.id))]
    pub async fn execute(&self, opportunity: &ArbitrageOpportunity) -> ExecutionReport {
        let market = &opportunity.market;
        let size = opportunity.position_size;

        info!(
            size = %size,
            yes_ask = %opportunity.yes_ask,
            no_ask = %opportunity.no_ask,
            net_profit = %opportunity.net_profit,
            "executing arbitrage"
        );

        // Submit both legs concurrently and wait for both to settle.
        let (yes_result, no_result) = tokio::join!(
            self.gateway.place_limit_order(
                &market.yes_token_id,
                Outcome::Yes,
                Side::Buy,
                opportunity.yes_ask,
                size,
            ),
            self.gateway.place_limit_order(
                &market.no_token_id,
                Outcome::No,
                Side::Buy,
                opportunity.no_ask,
                size,
            ),
        );

        let (yes_order, no_order) = match (yes_result, no_result) {
            (Ok(yes), Ok(no)) => (yes, no),
            (Ok(yes), Err(err)) => {
                error!(error = %err, "NO leg submission failed");
                self.cancel_order(&yes).await;
                metrics::record_execution("failed");
                return ExecutionReport::terminal(ExecutionOutcome::Failed);
            }
            (Err(err), Ok(no)) => {
                error!(error = %err, "YES leg submission failed");
                self.cancel_order(&no).await;
                metrics::record_execution("failed");
                return ExecutionReport::terminal(ExecutionOutcome::Failed);
            }
            (Err(yes_err), Err(no_err)) => {
                error!(yes_error = %yes_err, no_error = %no_err, "both leg submissions failed");
                metrics::record_execution("failed");
                return ExecutionReport::terminal(ExecutionOutcome::Failed);
            }
        };

        debug!(
            yes_order = yes_order.id.as_deref().unwrap_or("?"),
            no_order = no_order.id.as_deref().unwrap_or("?"),
            "both legs acknowledged"
        );

        let mut pair = TradePair::new(market.id.clone(), yes_order, no_order);
        self.save_order(&pair.yes_order, &pair.market_id).await;
        self.save_order(&pair.no_order, &pair.market_id).await;

        // Poll for fills under the hard timeout. A one-sided fill keeps
        // polling: the other leg may still catch up before the deadline.
        let deadline = Instant::now() + self.config.order_timeout();
        let mut partial_seen = false;

        while Instant::now() < deadline {
            self.refresh_pair(&mut pair).await;

            if pair.is_fully_filled() {
                return self.finish_fully_filled(pair).await;
            }

            if pair.is_partially_filled() && !partial_seen {
                partial_seen = true;
                warn!(market = %pair.market_id, "one leg filled, waiting for the other");
            }

            sleep(self.config.poll_interval()).await;
        }

        warn!(
            market = %pair.market_id,
            timeout_s = self.config.order_timeout_seconds,
            "fill timeout reached"
        );

        // Cancel whatever is still unfilled, exactly once, then take one
        // final status snapshot: a fill can race the cancellation.
        self.cancel_unfilled(&pair).await;
        self.refresh_pair(&mut pair).await;

        if pair.is_fully_filled() {
            return self.finish_fully_filled(pair).await;
        }

        if pair.is_partially_filled() {
            return self.finish_partial_fill(pair).await;
        }

        metrics::record_execution("timed_out");
        ExecutionReport {
            outcome: ExecutionOutcome::TimedOut,
            pair: Some(pair),
            realized_pnl: None,
        }
    }

    /// Poll the gateway for every not-yet-filled leg and fold the results
    /// into the pair. Status errors are logged and skipped; the timeout
    /// bounds how long a silent gateway can stall the attempt.
    async fn refresh_pair(&self, pair: &mut TradePair) {
        let now = OffsetDateTime::now_utc();

        for order in [&mut pair.yes_order, &mut pair.no_order] {
            if order.is_filled() {
                continue;
            }
            let Some(id) = order.id.clone() else { continue };

            match self.gateway.get_order_status(&id).await {
                Ok(update) => order.apply_update(&update, now),
                Err(err) => {
                    warn!(order_id = %id, error = %err, "order status check failed");
                }
            }
        }

        self.save_order(&pair.yes_order, &pair.market_id).await;
        self.save_order(&pair.no_order, &pair.market_id).await;
    }

    /// Cancel all unfilled legs concurrently. Failures are logged; the
    /// outcome classification proceeds regardless.
    async fn cancel_unfilled(&self, pair: &TradePair) {
        let ids: Vec<String> = pair
            .unfilled_legs()
            .into_iter()
            .filter_map(|o| o.id.clone())
            .collect();

        let cancels = ids.iter().map(|id| self.gateway.cancel_order(id));
        for (id, result) in ids.iter().zip(join_all(cancels).await) {
            match result {
                Ok(true) => info!(order_id = %id, "unfilled leg cancelled"),
                Ok(false) => debug!(order_id = %id, "leg already terminal at venue"),
                Err(err) => error!(order_id = %id, error = %err, "failed to cancel leg"),
            }
        }
    }

    async fn finish_fully_filled(&self, pair: TradePair) -> ExecutionReport {
        info!(
            market = %pair.market_id,
            yes_filled = %pair.yes_order.filled_size,
            no_filled = %pair.no_order.filled_size,
            "both legs filled"
        );

        self.record_position(&pair.yes_order, &pair.market_id).await;
        self.record_position(&pair.no_order, &pair.market_id).await;

        metrics::record_execution("fully_filled");
        ExecutionReport {
            outcome: ExecutionOutcome::FullyFilled,
            pair: Some(pair),
            realized_pnl: None,
        }
    }

    async fn finish_partial_fill(&self, pair: TradePair) -> ExecutionReport {
        let Some(filled) = pair.filled_leg().cloned() else {
            // Unreachable given is_partially_filled, but never panic here.
            return ExecutionReport {
                outcome: ExecutionOutcome::Failed,
                pair: Some(pair),
                realized_pnl: None,
            };
        };

        warn!(
            market = %pair.market_id,
            leg = %filled.outcome,
            filled_size = %filled.filled_size,
            "partial fill: one leg filled"
        );

        // The one-sided exposure is real; track it before deciding what to
        // do about it.
        self.record_position(&filled, &pair.market_id).await;

        if !self.config.partial_fill_unwind {
            metrics::record_execution("partially_filled");
            return ExecutionReport {
                outcome: ExecutionOutcome::PartiallyFilled,
                pair: Some(pair),
                realized_pnl: None,
            };
        }

        let (outcome, realized_pnl) = self.attempt_unwind(&filled, &pair.market_id).await;
        metrics::record_execution(match outcome {
            ExecutionOutcome::Unwound => "unwound",
            _ => "unwind_failed",
        });

        if let Some(pnl) = realized_pnl {
            let entry = PnLEntry {
                market_id: pair.market_id.clone(),
                realized_pnl: pnl,
                fees_paid: self.config.estimated_fee_per_trade(),
                entry_cost: filled.filled_size * filled.entry_price(),
                exit_value: filled.filled_size * filled.entry_price() + pnl,
                timestamp: OffsetDateTime::now_utc(),
                notes: Some("partial fill unwind".to_string()),
            };
            if let Err(err) = self.ledger.save_pnl_entry(&entry).await {
                warn!(error = %err, "failed to record unwind pnl");
            }
            if let Err(err) = self.ledger.close_position(&filled.token_id).await {
                warn!(error = %err, "failed to close unwound position");
            }
        }

        ExecutionReport {
            outcome,
            pair: Some(pair),
            realized_pnl,
        }
    }

    /// Sell the filled leg back at the best bid. Returns the terminal
    /// outcome and, on success, the realized round-trip PnL.
    async fn attempt_unwind(
        &self,
        filled: &Order,
        market_id: &str,
    ) -> (ExecutionOutcome, Option<Decimal>) {
        info!(
            market = %market_id,
            token = %filled.token_id,
            size = %filled.filled_size,
            "attempting to unwind one-sided fill"
        );

        let book = match self
            .feed
            .get_order_book(&filled.token_id, filled.outcome)
            .await
        {
            Ok(book) => book,
            Err(err) => {
                error!(error = %err, "could not fetch book for unwind");
                return (ExecutionOutcome::UnwindFailed, None);
            }
        };

        let Some(best_bid) = book.best_bid().copied() else {
            error!(token = %filled.token_id, "no bid available for unwind");
            return (ExecutionOutcome::UnwindFailed, None);
        };

        let sell = match self
            .gateway
            .place_limit_order(
                &filled.token_id,
                filled.outcome,
                Side::Sell,
                best_bid.price,
                filled.filled_size,
            )
            .await
        {
            Ok(sell) => sell,
            Err(err) => {
                error!(error = %err, "failed to place unwind sell");
                return (ExecutionOutcome::UnwindFailed, None);
            }
        };

        self.save_order(&sell, market_id).await;

        // One grace sleep, then a single re-check. An unfilled sell stays
        // working at the venue so the operator still has a path to flat.
        sleep(self.config.unwind_grace()).await;

        let mut sell = sell;
        let Some(sell_id) = sell.id.clone() else {
            return (ExecutionOutcome::UnwindFailed, None);
        };

        match self.gateway.get_order_status(&sell_id).await {
            Ok(update) => sell.apply_update(&update, OffsetDateTime::now_utc()),
            Err(err) => {
                error!(order_id = %sell_id, error = %err, "unwind status check failed");
                return (ExecutionOutcome::UnwindFailed, None);
            }
        }
        self.save_order(&sell, market_id).await;

        if sell.is_filled() {
            let proceeds = sell.filled_size * sell.entry_price();
            let cost = filled.filled_size * filled.entry_price();
            let realized = proceeds - cost;
            info!(realized_pnl = %realized, "unwind complete");
            (ExecutionOutcome::Unwound, Some(realized))
        } else {
            error!(
                order_id = %sell_id,
                token = %filled.token_id,
                "unwind sell not filled; exposure remains open"
            );
            (ExecutionOutcome::UnwindFailed, None)
        }
    }

    async fn cancel_order(&self, order: &Order) {
        if let Some(id) = &order.id {
            if let Err(err) = self.gateway.cancel_order(id).await {
                error!(order_id = %id, error = %err, "failed to cancel order");
            }
        }
    }

    async fn save_order(&self, order: &Order, market_id: &str) {
        if let Err(err) = self.ledger.save_order(order, market_id).await {
            warn!(error = %err, "failed to persist order");
        }
    }

    async fn record_position(&self, order: &Order, market_id: &str) {
        let position = Position::open(
            market_id,
            &order.token_id,
            order.outcome,
            order.filled_size,
            order.entry_price(),
            OffsetDateTime::now_utc(),
        );
        if let Err(err) = self.ledger.save_position(&position).await {
            warn!(error = %err, "failed to persist position");
        }
    }
}
