//! Mock order gateway for unit testing.
//!
//! Fill behavior is scripted per (token, side) so tests can stage full
//! fills, one-sided fills, rejections, and orders that never fill.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::GatewayError;
use crate::market::Outcome;

use super::gateway::OrderGateway;
use super::order::{Order, OrderStatus, OrderUpdate, Side};

/// Scripted behavior for orders on one (token, side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillBehavior {
    /// Report fully filled on the first status poll.
    FillImmediately,
    /// Report live until this many status polls have happened.
    FillAfterPolls(u32),
    /// Stay live until cancelled.
    NeverFill,
    /// Fail the placement call itself.
    RejectSubmission,
}

#[derive(Debug)]
struct MockOrder {
    order: Order,
    behavior: FillBehavior,
    polls: u32,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    behaviors: HashMap<(String, Side), FillBehavior>,
    orders: HashMap<String, MockOrder>,
}

/// In-memory [`OrderGateway`] implementation for tests.
#[derive(Debug, Clone, Default)]
pub struct MockOrderGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockOrderGateway {
    /// Create a gateway where every order fills immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior for orders on a (token, side).
    pub fn set_behavior(&self, token_id: impl Into<String>, side: Side, behavior: FillBehavior) {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert((token_id.into(), side), behavior);
    }

    /// Ids of orders still working at the venue (placed, not filled, not
    /// cancelled).
    pub fn open_order_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .orders
            .iter()
            .filter(|(_, o)| !o.cancelled && !o.order.is_filled())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Total orders ever placed.
    pub fn placed_order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    /// Whether a specific order was cancelled.
    pub fn was_cancelled(&self, order_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .orders
            .get(order_id)
            .map(|o| o.cancelled)
            .unwrap_or(false)
    }

    fn behavior_for(state: &MockState, token_id: &str, side: Side) -> FillBehavior {
        state
            .behaviors
            .get(&(token_id.to_string(), side))
            .copied()
            .unwrap_or(FillBehavior::FillImmediately)
    }
}

#[async_trait]
impl OrderGateway for MockOrderGateway {
    async fn place_limit_order(
        &self,
        token_id: &str,
        outcome: Outcome,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, GatewayError> {
        let mut state = self.state.lock().unwrap();
        let behavior = Self::behavior_for(&state, token_id, side);

        if behavior == FillBehavior::RejectSubmission {
            return Err(GatewayError::SubmissionFailed(
                "mock submission rejection".to_string(),
            ));
        }

        state.next_id += 1;
        let order_id = format!("mock-{}", state.next_id);

        let mut order = Order::new(
            token_id,
            outcome,
            side,
            price,
            size,
            OffsetDateTime::now_utc(),
        );
        order.id = Some(order_id.clone());
        order.status = OrderStatus::Live;

        state.orders.insert(
            order_id,
            MockOrder {
                order: order.clone(),
                behavior,
                polls: 0,
                cancelled: false,
            },
        );

        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError> {
        let mut state = self.state.lock().unwrap();
        match state.orders.get_mut(order_id) {
            Some(mock) => {
                if mock.order.is_filled() {
                    return Ok(false);
                }
                mock.cancelled = true;
                mock.order.status = OrderStatus::Canceled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderUpdate, GatewayError> {
        let mut state = self.state.lock().unwrap();
        let mock = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::StatusFailed {
                order_id: order_id.to_string(),
                reason: "unknown order".to_string(),
            })?;

        mock.polls += 1;

        if mock.cancelled {
            return Ok(OrderUpdate {
                status: Some(OrderStatus::Canceled),
                filled_size: Some(mock.order.filled_size),
                average_price: mock.order.average_price,
            });
        }

        let fills_now = match mock.behavior {
            FillBehavior::FillImmediately => true,
            FillBehavior::FillAfterPolls(n) => mock.polls > n,
            FillBehavior::NeverFill | FillBehavior::RejectSubmission => false,
        };

        if fills_now {
            mock.order.status = OrderStatus::Filled;
            mock.order.filled_size = mock.order.size;
            mock.order.average_price = Some(mock.order.price);
        }

        Ok(OrderUpdate {
            status: Some(mock.order.status),
            filled_size: Some(mock.order.filled_size),
            average_price: mock.order.average_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn immediate_fill_reports_on_first_poll() {
        let gateway = MockOrderGateway::new();
        let order = gateway
            .place_limit_order("tok", Outcome::Yes, Side::Buy, dec!(0.50), dec!(10))
            .await
            .unwrap();

        let id = order.id.unwrap();
        let update = gateway.get_order_status(&id).await.unwrap();
        assert_eq!(update.status, Some(OrderStatus::Filled));
        assert_eq!(update.filled_size, Some(dec!(10)));
    }

    #[tokio::test]
    async fn fill_after_polls_counts_down() {
        let gateway = MockOrderGateway::new();
        gateway.set_behavior("tok", Side::Buy, FillBehavior::FillAfterPolls(2));

        let order = gateway
            .place_limit_order("tok", Outcome::Yes, Side::Buy, dec!(0.50), dec!(10))
            .await
            .unwrap();
        let id = order.id.unwrap();

        assert_eq!(
            gateway.get_order_status(&id).await.unwrap().status,
            Some(OrderStatus::Live)
        );
        assert_eq!(
            gateway.get_order_status(&id).await.unwrap().status,
            Some(OrderStatus::Live)
        );
        assert_eq!(
            gateway.get_order_status(&id).await.unwrap().status,
            Some(OrderStatus::Filled)
        );
    }

    #[tokio::test]
    async fn rejection_fails_placement() {
        let gateway = MockOrderGateway::new();
        gateway.set_behavior("tok", Side::Buy, FillBehavior::RejectSubmission);

        let result = gateway
            .place_limit_order("tok", Outcome::Yes, Side::Buy, dec!(0.50), dec!(10))
            .await;
        assert!(result.is_err());
        assert_eq!(gateway.placed_order_count(), 0);
    }

    #[tokio::test]
    async fn cancel_closes_live_orders_only() {
        let gateway = MockOrderGateway::new();
        gateway.set_behavior("tok", Side::Buy, FillBehavior::NeverFill);

        let order = gateway
            .place_limit_order("tok", Outcome::Yes, Side::Buy, dec!(0.50), dec!(10))
            .await
            .unwrap();
        let id = order.id.unwrap();

        assert_eq!(gateway.open_order_ids(), vec![id.clone()]);
        assert!(gateway.cancel_order(&id).await.unwrap());
        assert!(gateway.open_order_ids().is_empty());
        assert!(gateway.was_cancelled(&id));
    }
}
