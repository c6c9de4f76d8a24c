//! Circuit breaker halting new executions after repeated failures.
//!
//! Two conditions trip it: a run of consecutive gateway failures, or a
//! failed unwind (standing one-sided exposure). A tripped breaker blocks new
//! executions until an operator calls [`CircuitBreaker::reset`]; it never
//! cancels orders already at the venue.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use tracing::{error, info};

/// Why the breaker tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripReason {
    /// Too many gateway failures in a row.
    ConsecutiveGatewayFailures {
        /// Observed failure streak.
        count: u32,
        /// Configured limit.
        limit: u32,
    },
    /// An unwind did not complete; one-sided exposure is open.
    UnwindFailed {
        /// Market carrying the exposure.
        market_id: String,
    },
}

impl std::fmt::Display for TripReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TripReason::ConsecutiveGatewayFailures { count, limit } => {
                write!(f, "{count} consecutive gateway failures (limit {limit})")
            }
            TripReason::UnwindFailed { market_id } => {
                write!(f, "unwind failed in market {market_id}")
            }
        }
    }
}

/// Latching halt switch for the execution path.
///
/// Atomics keep the hot-path checks lock-free; a future concurrent-trade
/// extension can share this across tasks without additional synchronization.
pub struct CircuitBreaker {
    max_consecutive_failures: u32,
    halted: AtomicBool,
    consecutive_failures: AtomicU32,
    trip_reason: Mutex<Option<TripReason>>,
}

impl CircuitBreaker {
    /// Create a breaker tripping after the given gateway-failure streak.
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            max_consecutive_failures: max_consecutive_failures.max(1),
            halted: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            trip_reason: Mutex::new(None),
        }
    }

    /// Whether new executions are currently blocked.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// The reason for the current halt, if any.
    pub fn trip_reason(&self) -> Option<TripReason> {
        self.trip_reason.lock().unwrap().clone()
    }

    /// Record a successful execution; clears the failure streak.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Record a gateway failure; trips once the streak hits the limit.
    pub fn record_gateway_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.max_consecutive_failures {
            self.trip(TripReason::ConsecutiveGatewayFailures {
                count: failures,
                limit: self.max_consecutive_failures,
            });
        }
    }

    /// Record a failed unwind; trips immediately.
    pub fn record_unwind_failure(&self, market_id: &str) {
        self.trip(TripReason::UnwindFailed {
            market_id: market_id.to_string(),
        });
    }

    fn trip(&self, reason: TripReason) {
        error!(%reason, "circuit breaker tripped, halting new executions");
        self.halted.store(true, Ordering::SeqCst);
        *self.trip_reason.lock().unwrap() = Some(reason);
    }

    /// Manual reset by an operator.
    pub fn reset(&self) {
        info!("circuit breaker reset");
        self.halted.store(false, Ordering::SeqCst);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        *self.trip_reason.lock().unwrap() = None;
    }
}
