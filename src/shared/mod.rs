/// Shared utilities and types used across all layers
///
/// This module contains:
/// - Protocol definitions (sides, order types, requests, acks); acks carry
///   `domain::Trade` and parsing reports `domain::validation::ValidationError`
/// - Audit clock and order id allocation
/// - Prometheus metrics

pub mod ids;
pub mod metrics;
pub mod protocol;
pub mod timestamp;

// Re-export commonly used types
pub use protocol::{
    CancelOrderRequest, ClientCommand, NewOrderRequest, OrderAck, OrderId, OrderStatus,
    OrderType, Sequence, Side, SubmitOrder, TradeId,
};

pub use ids::OrderIdAllocator;
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};
