/// Application Services
///
/// - `MatchingEngine`: single-symbol engine (stage, commit, apply)
/// - `Exchange`: mutex-per-symbol multi-symbol surface
/// - `PartitionedService`: symbols pinned to worker threads, fed by channels
///
/// `Exchange` and `PartitionedService` both implement `OrderGateway`, the
/// command surface the interfaces layer drives.

pub mod context;
pub mod exchange;
pub mod matching_engine;
pub mod partitioned_service;
mod recovery;

pub use context::EngineContext;
pub use exchange::Exchange;
pub use matching_engine::{EngineSnapshot, Execution, MatchingEngine};
pub use partitioned_service::{PartitionConfig, PartitionStats, PartitionedService};

use crate::application::error::EngineError;
use crate::domain::order::Order;
use crate::shared::protocol::{
    CancelOrderRequest, NewOrderRequest, OrderAck, OrderId, SubmitOrder,
};

/// Command surface over any number of symbols
pub trait OrderGateway: Send + Sync {
    fn submit(&self, request: NewOrderRequest) -> Result<Execution, EngineError>;

    fn cancel(&self, order_id: OrderId) -> Result<Order, EngineError>;

    /// String-level submit. Requests that fail parsing or validation come
    /// back as a `Rejected` ack without an order id; only failures of an
    /// otherwise acceptable command are returned as `Err`.
    fn submit_order(&self, raw: SubmitOrder) -> Result<OrderAck, EngineError> {
        let quantity = raw.quantity;
        let request = match NewOrderRequest::try_from(raw) {
            Ok(request) => request,
            Err(e) => return Ok(OrderAck::rejected(quantity, e.to_string())),
        };
        match self.submit(request) {
            Ok(execution) => Ok(execution.into()),
            Err(EngineError::Validation(e)) => Ok(OrderAck::rejected(quantity, e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn cancel_order(&self, request: CancelOrderRequest) -> Result<OrderAck, EngineError> {
        let order = self.cancel(request.order_id)?;
        Ok(OrderAck {
            order_id: Some(order.order_id()),
            status: order.status(),
            filled_quantity: order.filled_quantity(),
            remaining_quantity: order.remaining_quantity(),
            trades: Vec::new(),
            reason: None,
        })
    }
}
