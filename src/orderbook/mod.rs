//! Order book snapshots and derived quantities.

pub mod types;

pub use types::{OrderBook, PriceLevel};
