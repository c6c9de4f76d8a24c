//! Market and outcome types for binary prediction markets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Outcome side of a binary market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// YES outcome token.
    #[strum(serialize = "YES", serialize = "yes")]
    #[default]
    Yes,
    /// NO outcome token.
    #[strum(serialize = "NO", serialize = "no")]
    No,
}

impl Outcome {
    /// Get the opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }
}

/// A binary-outcome prediction market.
///
/// Both token ids are always present and distinct; the feed parser rejects
/// markets that do not satisfy this.
#[derive(Debug, Clone)]
pub struct Market {
    /// Unique market identifier.
    pub id: String,
    /// Human-readable market question.
    pub title: String,
    /// Condition ID used for resolution.
    pub condition_id: String,
    /// YES outcome token ID.
    pub yes_token_id: String,
    /// NO outcome token ID.
    pub no_token_id: String,
    /// When the market resolves.
    pub end_date: OffsetDateTime,
    /// Total traded volume in currency units.
    pub volume: Decimal,
    /// Market category, if reported.
    pub category: Option<String>,
}

impl Market {
    /// Token ID for a given outcome.
    pub fn token_id(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::Yes => &self.yes_token_id,
            Outcome::No => &self.no_token_id,
        }
    }

    /// Whole days until resolution, floored at zero.
    pub fn days_to_resolution(&self, now: OffsetDateTime) -> i64 {
        (self.end_date - now).whole_days().max(0)
    }

    /// Whether the market is still trading.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        now < self.end_date
    }
}
