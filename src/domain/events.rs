//! Engine events
//!
//! One event per meaningful transition. A command's events are appended to
//! the event log as a single batch, and in-memory state is only ever changed
//! by applying these events, live or during replay.

use serde::{Deserialize, Serialize};

use crate::domain::trade::Trade;
use crate::shared::protocol::{OrderId, OrderType, Sequence, Side};
use crate::shared::timestamp::Timestamp;

/// Why an order left the book without filling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Explicit cancel command
    UserRequested,
    /// Market order ran out of liquidity after a partial fill
    MarketRemainder,
}

impl CancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelReason::UserRequested => "user_requested",
            CancelReason::MarketRemainder => "market_remainder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    OrderAccepted {
        order_id: OrderId,
        account_id: u64,
        symbol: String,
        side: Side,
        order_type: OrderType,
        quantity: u64,
        price: u64,
        sequence: Sequence,
        client_request_id: Option<String>,
        timestamp: Timestamp,
    },
    TradeExecuted {
        trade: Trade,
    },
    OrderRested {
        symbol: String,
        order_id: OrderId,
        price: u64,
        remaining_quantity: u64,
        timestamp: Timestamp,
    },
    OrderRejected {
        symbol: String,
        order_id: OrderId,
        reason: String,
        timestamp: Timestamp,
    },
    OrderCancelled {
        symbol: String,
        order_id: OrderId,
        reason: CancelReason,
        remaining_quantity: u64,
        timestamp: Timestamp,
    },
}

impl EngineEvent {
    pub fn symbol(&self) -> &str {
        match self {
            EngineEvent::OrderAccepted { symbol, .. }
            | EngineEvent::OrderRested { symbol, .. }
            | EngineEvent::OrderRejected { symbol, .. }
            | EngineEvent::OrderCancelled { symbol, .. } => symbol,
            EngineEvent::TradeExecuted { trade } => &trade.symbol,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::OrderAccepted { .. } => "order_accepted",
            EngineEvent::TradeExecuted { .. } => "trade_executed",
            EngineEvent::OrderRested { .. } => "order_rested",
            EngineEvent::OrderRejected { .. } => "order_rejected",
            EngineEvent::OrderCancelled { .. } => "order_cancelled",
        }
    }
}

/// An event together with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub position: u64,
    pub event: EngineEvent,
}
