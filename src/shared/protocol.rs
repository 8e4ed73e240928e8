/// Wire-level protocol types
///
/// These are the closed enumerations and request/ack shapes that cross the
/// boundary between the calling layer (RPC service, CLI, load generator) and
/// the matching core. String forms of side and type are parsed exactly once
/// here, so nothing past this module re-checks them at runtime.
///
/// Prices and quantities are `u64` fixed-point integers. The scale is a
/// caller convention: with a scale of 100, price `5000` means `50.00`.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::trade::Trade;
use crate::domain::validation::ValidationError;

/// Globally unique order identifier
pub type OrderId = u64;

/// Trade identifier, unique per symbol
pub type TradeId = u64;

/// Per-symbol acceptance sequence, the definitive time-priority tie-breaker
pub type Sequence = u64;

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order of this side matches against
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(ValidationError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单类型：市价单或限价单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            _ => Err(ValidationError::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle state
///
/// `Filled`, `Cancelled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, PartiallyFilled | Filled | Cancelled | Rejected) => true,
            (PartiallyFilled, PartiallyFilled | Filled | Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed new-order request, produced once the boundary strings are parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub account_id: u64,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: u64,
    /// Ignored for market orders
    pub price: u64,
    /// Client-supplied idempotency key
    #[serde(default)]
    pub client_request_id: Option<String>,
}

impl NewOrderRequest {
    pub fn limit(account_id: u64, symbol: &str, side: Side, price: u64, quantity: u64) -> Self {
        Self {
            account_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price,
            client_request_id: None,
        }
    }

    pub fn market(account_id: u64, symbol: &str, side: Side, quantity: u64) -> Self {
        Self {
            account_id,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: 0,
            client_request_id: None,
        }
    }

    pub fn with_client_request_id(mut self, id: impl Into<String>) -> Self {
        self.client_request_id = Some(id.into());
        self
    }
}

/// `SubmitOrder` as it arrives from the calling layer, side and type still strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub quantity: u64,
    #[serde(default)]
    pub price: u64,
    pub account_id: u64,
    #[serde(default)]
    pub client_request_id: Option<String>,
}

impl TryFrom<SubmitOrder> for NewOrderRequest {
    type Error = ValidationError;

    fn try_from(raw: SubmitOrder) -> Result<Self, Self::Error> {
        Ok(NewOrderRequest {
            side: raw.side.parse()?,
            order_type: raw.order_type.parse()?,
            account_id: raw.account_id,
            symbol: raw.symbol,
            quantity: raw.quantity,
            price: raw.price,
            client_request_id: raw.client_request_id,
        })
    }
}

/// 撤单请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub order_id: OrderId,
}

/// One command line of the command surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientCommand {
    Submit(SubmitOrder),
    Cancel(CancelOrderRequest),
}

/// Acknowledgement returned for every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// `None` when the request was rejected before an id was assigned
    pub order_id: Option<OrderId>,
    pub status: OrderStatus,
    pub filled_quantity: u64,
    pub remaining_quantity: u64,
    pub trades: Vec<Trade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OrderAck {
    /// Ack for a request that failed boundary validation
    pub fn rejected(quantity: u64, reason: impl Into<String>) -> Self {
        Self {
            order_id: None,
            status: OrderStatus::Rejected,
            filled_quantity: 0,
            remaining_quantity: quantity,
            trades: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}
