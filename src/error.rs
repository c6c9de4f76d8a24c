//! Unified error types for the arbitrage engine.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Market feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Order gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Ledger persistence error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Market data errors. A per-market feed failure is isolated and logged by
/// the scanner; it never aborts a scan cycle.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Failed to fetch a remote resource.
    #[error("failed to fetch {resource}: {reason}")]
    FetchFailed {
        /// Market id or token id that failed.
        resource: String,
        /// Reason for failure.
        reason: String,
    },

    /// Response body could not be parsed into domain types.
    #[error("failed to parse market data: {0}")]
    Parse(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Order gateway errors. Any of these aborts the current execution attempt;
/// already-placed legs are rolled back via cancellation.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Order submission failed.
    #[error("order submission failed: {0}")]
    SubmissionFailed(String),

    /// Order rejected by the exchange.
    #[error("order rejected: {reason}")]
    Rejected {
        /// Rejection reason from the exchange.
        reason: String,
    },

    /// Failed to cancel an order.
    #[error("failed to cancel order {order_id}: {reason}")]
    CancelFailed {
        /// Order ID that failed to cancel.
        order_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to query order status.
    #[error("failed to get status for order {order_id}: {reason}")]
    StatusFailed {
        /// Order ID.
        order_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid order parameters (caught before hitting the wire).
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),
}

/// Persistence errors from the ledger backend.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;
