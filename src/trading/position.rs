//! Positions and realized PnL entries.

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::market::Outcome;

/// A realized holding after a fill. Created by the executor, owned by the
/// ledger thereafter.
#[derive(Debug, Clone)]
pub struct Position {
    /// Market this position belongs to.
    pub market_id: String,
    /// Token held.
    pub token_id: String,
    /// Which outcome the token resolves.
    pub outcome: Outcome,
    /// Number of shares held.
    pub size: Decimal,
    /// Average entry price.
    pub average_entry_price: Decimal,
    /// Total entry cost.
    pub total_cost: Decimal,
    /// Latest mark price, if marked.
    pub current_price: Option<Decimal>,
    /// Unrealized PnL at the latest mark.
    pub unrealized_pnl: Option<Decimal>,
    /// When the position was opened.
    pub opened_at: OffsetDateTime,
}

impl Position {
    /// Open a position from a fill.
    pub fn open(
        market_id: impl Into<String>,
        token_id: impl Into<String>,
        outcome: Outcome,
        size: Decimal,
        average_entry_price: Decimal,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            token_id: token_id.into(),
            outcome,
            size,
            average_entry_price,
            total_cost: size * average_entry_price,
            current_price: None,
            unrealized_pnl: None,
            opened_at: now,
        }
    }

    /// Update the mark price and recompute unrealized PnL.
    pub fn mark_to_market(&mut self, price: Decimal) {
        self.current_price = Some(price);
        self.unrealized_pnl = Some(price * self.size - self.total_cost);
    }
}

/// One realized PnL ledger entry.
#[derive(Debug, Clone)]
pub struct PnLEntry {
    /// Market the entry belongs to.
    pub market_id: String,
    /// Realized profit or loss.
    pub realized_pnl: Decimal,
    /// Fees paid on the round trip.
    pub fees_paid: Decimal,
    /// Total entry cost.
    pub entry_cost: Decimal,
    /// Total exit value.
    pub exit_value: Decimal,
    /// When the entry was recorded.
    pub timestamp: OffsetDateTime,
    /// Free-form context.
    pub notes: Option<String>,
}

impl PnLEntry {
    /// Net PnL after fees.
    pub fn net_pnl(&self) -> Decimal {
        self.realized_pnl - self.fees_paid
    }

    /// Return on the entry cost, in percent.
    pub fn roi(&self) -> Decimal {
        if self.entry_cost > Decimal::ZERO {
            self.net_pnl() / self.entry_cost * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}
