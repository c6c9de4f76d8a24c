//! Orders, positions, the order gateway, and the execution engine.

pub mod executor;
pub mod gateway;
pub mod mock;
pub mod order;
pub mod position;

pub use executor::{ExecutionOutcome, ExecutionReport, Executor};
pub use gateway::{HttpOrderGateway, OrderGateway};
pub use mock::{FillBehavior, MockOrderGateway};
pub use order::{Order, OrderStatus, OrderUpdate, Side, TradePair};
pub use position::{PnLEntry, Position};
