//! Order types and the two-leg trade pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

use crate::market::Outcome;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(serialize = "SELL", serialize = "sell")]
    Sell,
}

/// Order lifecycle status reported by the exchange.
///
/// Transitions are monotonic: once a terminal status is reached the order
/// never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Submitted, not yet acknowledged on the book.
    #[default]
    #[strum(serialize = "pending", serialize = "PENDING")]
    Pending,
    /// Resting on the book.
    #[strum(serialize = "live", serialize = "LIVE")]
    Live,
    /// Fully filled.
    #[strum(serialize = "filled", serialize = "FILLED")]
    Filled,
    /// Cancelled before completing.
    #[strum(
        serialize = "canceled",
        serialize = "cancelled",
        serialize = "CANCELED",
        serialize = "CANCELLED"
    )]
    Canceled,
    /// Rejected by the exchange.
    #[strum(serialize = "rejected", serialize = "REJECTED")]
    Rejected,
    /// Expired on the book.
    #[strum(serialize = "expired", serialize = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Whether the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// A single order, either pending submission or acknowledged by the venue.
#[derive(Debug, Clone)]
pub struct Order {
    /// Exchange-assigned id; `None` until acknowledged.
    pub id: Option<String>,
    /// Token being traded.
    pub token_id: String,
    /// Which outcome the token resolves.
    pub outcome: Outcome,
    /// Buy or sell.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Requested size in currency units.
    pub size: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Size filled so far; never exceeds `size`.
    pub filled_size: Decimal,
    /// Average fill price, once any fill exists.
    pub average_price: Option<Decimal>,
    /// When the order was created locally.
    pub created_at: OffsetDateTime,
    /// When the order was last updated.
    pub updated_at: OffsetDateTime,
}

impl Order {
    /// Create a new local order awaiting submission.
    pub fn new(
        token_id: impl Into<String>,
        outcome: Outcome,
        side: Side,
        price: Decimal,
        size: Decimal,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: None,
            token_id: token_id.into(),
            outcome,
            side,
            price,
            size,
            status: OrderStatus::Pending,
            filled_size: Decimal::ZERO,
            average_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled || self.filled_size >= self.size
    }

    /// Whether some but not all of the order filled.
    pub fn is_partially_filled(&self) -> bool {
        self.filled_size > Decimal::ZERO && self.filled_size < self.size
    }

    /// Unfilled remainder.
    pub fn remaining_size(&self) -> Decimal {
        self.size - self.filled_size
    }

    /// Effective entry price: average fill price when known, limit otherwise.
    pub fn entry_price(&self) -> Decimal {
        self.average_price.unwrap_or(self.price)
    }

    /// Fold a gateway status report into this order. The filled size is
    /// clamped so it never exceeds the requested size.
    pub fn apply_update(&mut self, update: &OrderUpdate, now: OffsetDateTime) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(filled) = update.filled_size {
            self.filled_size = filled.min(self.size);
        }
        if update.average_price.is_some() {
            self.average_price = update.average_price;
        }
        self.updated_at = now;
    }
}

/// Status report for one order as seen by the gateway. Fields the venue did
/// not report are `None` and leave the local order untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    /// Reported lifecycle status.
    pub status: Option<OrderStatus>,
    /// Reported filled size.
    pub filled_size: Option<Decimal>,
    /// Reported average fill price.
    pub average_price: Option<Decimal>,
}

/// The two legs of one arbitrage execution, created atomically when the
/// attempt starts. Owned by the executor until the attempt resolves.
#[derive(Debug, Clone)]
pub struct TradePair {
    /// Market being traded.
    pub market_id: String,
    /// YES leg.
    pub yes_order: Order,
    /// NO leg.
    pub no_order: Order,
    /// When the pair was created.
    pub created_at: OffsetDateTime,
}

impl TradePair {
    /// Create a pair from two freshly-built orders.
    pub fn new(market_id: impl Into<String>, yes_order: Order, no_order: Order) -> Self {
        let created_at = yes_order.created_at;
        Self {
            market_id: market_id.into(),
            yes_order,
            no_order,
            created_at,
        }
    }

    /// Both legs completely filled.
    pub fn is_fully_filled(&self) -> bool {
        self.yes_order.is_filled() && self.no_order.is_filled()
    }

    /// Exactly one leg completely filled.
    pub fn is_partially_filled(&self) -> bool {
        self.yes_order.is_filled() != self.no_order.is_filled()
    }

    /// The filled leg of a one-sided fill, if any.
    pub fn filled_leg(&self) -> Option<&Order> {
        match (self.yes_order.is_filled(), self.no_order.is_filled()) {
            (true, false) => Some(&self.yes_order),
            (false, true) => Some(&self.no_order),
            _ => None,
        }
    }

    /// Legs that are not yet filled.
    pub fn unfilled_legs(&self) -> Vec<&Order> {
        [&self.yes_order, &self.no_order]
            .into_iter()
            .filter(|o| !o.is_filled())
            .collect()
    }

    /// Total size filled across both legs.
    pub fn total_filled_size(&self) -> Decimal {
        self.yes_order.filled_size + self.no_order.filled_size
    }
}
