//! Persistence seam for orders, positions, and realized PnL.

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::trading::order::Order;
use crate::trading::position::{PnLEntry, Position};

/// Append/query store consumed by the executor and risk manager.
///
/// The executor writes through this trait as orders and positions change;
/// the risk manager reads open positions back for exposure accounting.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Persist an order snapshot (insert or update by order id).
    async fn save_order(&self, order: &Order, market_id: &str) -> Result<(), LedgerError>;

    /// Persist a newly-opened position.
    async fn save_position(&self, position: &Position) -> Result<(), LedgerError>;

    /// All positions not yet closed.
    async fn get_open_positions(&self) -> Result<Vec<Position>, LedgerError>;

    /// Close the open position for a token, if any.
    async fn close_position(&self, token_id: &str) -> Result<(), LedgerError>;

    /// Append a realized PnL entry.
    async fn save_pnl_entry(&self, entry: &PnLEntry) -> Result<(), LedgerError>;

    /// PnL entries recorded at or after `since`.
    async fn get_pnl_entries(&self, since: OffsetDateTime) -> Result<Vec<PnLEntry>, LedgerError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    orders: Vec<(String, Order)>,
    open_positions: Vec<Position>,
    closed_positions: Vec<Position>,
    pnl_entries: Vec<PnLEntry>,
}

/// In-memory ledger used for paper trading and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of order snapshots recorded.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Sum of entry costs across open positions.
    pub async fn total_exposure(&self) -> Decimal {
        self.state
            .lock()
            .await
            .open_positions
            .iter()
            .map(|p| p.total_cost)
            .sum()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn save_order(&self, order: &Order, market_id: &str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(id) = &order.id {
            if let Some(existing) = state
                .orders
                .iter_mut()
                .find(|(_, o)| o.id.as_deref() == Some(id))
            {
                existing.1 = order.clone();
                return Ok(());
            }
        }
        state.orders.push((market_id.to_string(), order.clone()));
        Ok(())
    }

    async fn save_position(&self, position: &Position) -> Result<(), LedgerError> {
        self.state
            .lock()
            .await
            .open_positions
            .push(position.clone());
        Ok(())
    }

    async fn get_open_positions(&self) -> Result<Vec<Position>, LedgerError> {
        Ok(self.state.lock().await.open_positions.clone())
    }

    async fn close_position(&self, token_id: &str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(index) = state
            .open_positions
            .iter()
            .position(|p| p.token_id == token_id)
        {
            let position = state.open_positions.remove(index);
            state.closed_positions.push(position);
        }
        Ok(())
    }

    async fn save_pnl_entry(&self, entry: &PnLEntry) -> Result<(), LedgerError> {
        self.state.lock().await.pnl_entries.push(entry.clone());
        Ok(())
    }

    async fn get_pnl_entries(&self, since: OffsetDateTime) -> Result<Vec<PnLEntry>, LedgerError> {
        Ok(self
            .state
            .lock()
            .await
            .pnl_entries
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect())
    }
}
