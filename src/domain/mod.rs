/// Domain Layer - Core Business Logic
///
/// Pure matching logic for a single instrument: no I/O, no locks, no
/// channels. Everything here can be tested in isolation.
///
/// ## Modules
/// - `order`: Order entity and lifecycle state machine
/// - `validation`: Business-rule validation of incoming requests
/// - `orderbook`: Price levels and the two-sided book
/// - `matching`: Price-time priority match planner
/// - `store`: Arena of every accepted order
/// - `trade`, `events`: Matching output and the replayable event model

pub mod events;
pub mod matching;
pub mod order;
pub mod orderbook;
pub mod store;
pub mod trade;
pub mod validation;

// Re-export key types
pub use events::{CancelReason, EngineEvent, LogEntry};
pub use matching::{plan_match, Fill, MatchPlan};
pub use order::{Order, OrderStateError};
pub use orderbook::{BookSnapshot, MarketView, OrderBook};
pub use store::OrderStore;
pub use trade::Trade;
pub use validation::{OrderValidator, ValidationConfig, ValidationError};
