//! Market types and the market data feed.

pub mod client;
pub mod feed;
pub mod mock;
pub mod types;

pub use client::HttpMarketFeed;
pub use feed::MarketFeed;
pub use mock::{BookBuilder, MockFeedConfig, MockMarketFeed};
pub use types::{Market, Outcome};
