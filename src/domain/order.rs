/// Order entity
///
/// Immutable identity (`order_id`, `account_id`, `symbol`, `side`, `type`,
/// `quantity`, `price`, `sequence`, `created_at`) plus the mutable lifecycle
/// fields (`remaining_quantity`, `status`, `updated_at`). Only the matching
/// engine mutates an order, and only through the methods below, which
/// enforce the lifecycle:
///
/// ```text
/// PENDING ──fill──► PARTIALLY_FILLED ──fill──► FILLED
///    │  └──────────────fill───────────────────►  ▲
///    ├──cancel──► CANCELLED ◄──cancel── PARTIALLY_FILLED
///    └──reject──► REJECTED
/// ```
///
/// Invariants: `0 <= remaining_quantity <= quantity`, and
/// `remaining_quantity == 0` exactly when `status == Filled`.
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::shared::protocol::{NewOrderRequest, OrderId, OrderStatus, OrderType, Sequence, Side};
use crate::shared::timestamp::Timestamp;

/// Attempted lifecycle move that the state machine forbids
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderStateError {
    #[error("order {order_id}: transition {from} -> {to} is not allowed")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("order {order_id}: fill of {fill} exceeds remaining {remaining}")]
    Overfill {
        order_id: OrderId,
        fill: u64,
        remaining: u64,
    },

    #[error("order {order_id}: fill quantity must be positive")]
    ZeroFill { order_id: OrderId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    account_id: u64,
    symbol: Arc<str>,
    side: Side,
    order_type: OrderType,
    quantity: u64,
    remaining_quantity: u64,
    /// Always 0 for market orders
    price: u64,
    status: OrderStatus,
    sequence: Sequence,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Builds a freshly accepted order in `Pending` state.
    ///
    /// The request must already have passed validation.
    pub fn accept(
        order_id: OrderId,
        sequence: Sequence,
        symbol: Arc<str>,
        request: &NewOrderRequest,
        created_at: Timestamp,
    ) -> Self {
        let price = match request.order_type {
            OrderType::Limit => request.price,
            OrderType::Market => 0,
        };

        Self {
            order_id,
            account_id: request.account_id,
            symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            remaining_quantity: request.quantity,
            price,
            status: OrderStatus::Pending,
            sequence,
            created_at,
            updated_at: created_at,
        }
    }

    #[inline]
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[inline]
    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[inline]
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    #[inline]
    pub fn remaining_quantity(&self) -> u64 {
        self.remaining_quantity
    }

    #[inline]
    pub fn filled_quantity(&self) -> u64 {
        self.quantity - self.remaining_quantity
    }

    #[inline]
    pub fn price(&self) -> u64 {
        self.price
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies an execution of `quantity` units.
    pub(crate) fn fill(&mut self, quantity: u64, at: Timestamp) -> Result<(), OrderStateError> {
        if quantity == 0 {
            return Err(OrderStateError::ZeroFill {
                order_id: self.order_id,
            });
        }
        if quantity > self.remaining_quantity {
            return Err(OrderStateError::Overfill {
                order_id: self.order_id,
                fill: quantity,
                remaining: self.remaining_quantity,
            });
        }

        let next = if quantity == self.remaining_quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.transition(next, at)?;
        self.remaining_quantity -= quantity;
        Ok(())
    }

    /// Cancels the open remainder; `remaining_quantity` is kept for audit.
    pub(crate) fn cancel(&mut self, at: Timestamp) -> Result<(), OrderStateError> {
        self.transition(OrderStatus::Cancelled, at)
    }

    /// Rejects an order that never traded.
    pub(crate) fn reject(&mut self, at: Timestamp) -> Result<(), OrderStateError> {
        self.transition(OrderStatus::Rejected, at)
    }

    fn transition(&mut self, next: OrderStatus, at: Timestamp) -> Result<(), OrderStateError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderStateError::InvalidTransition {
                order_id: self.order_id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_order(quantity: u64) -> Order {
        let request = NewOrderRequest::limit(9, "BTC/USD", Side::Buy, 5000, quantity);
        Order::accept(1, 1, Arc::from("BTC/USD"), &request, 100)
    }

    #[test]
    fn test_accept_initial_state() {
        let order = limit_order(100);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.remaining_quantity(), 100);
        assert_eq!(order.filled_quantity(), 0);
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn test_market_price_is_zeroed() {
        let mut request = NewOrderRequest::market(9, "BTC/USD", Side::Sell, 5);
        request.price = 777;
        let order = Order::accept(2, 2, Arc::from("BTC/USD"), &request, 0);
        assert_eq!(order.price(), 0);
    }

    #[test]
    fn test_partial_then_full_fill() {
        let mut order = limit_order(100);
        order.fill(40, 200).unwrap();
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity(), 60);
        assert_eq!(order.updated_at(), 200);

        order.fill(60, 300).unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.remaining_quantity(), 0);
        assert_eq!(order.created_at(), 100);
    }

    #[test]
    fn test_overfill_rejected_without_mutation() {
        let mut order = limit_order(10);
        let err = order.fill(11, 200).unwrap_err();
        assert!(matches!(err, OrderStateError::Overfill { .. }));
        assert_eq!(order.remaining_quantity(), 10);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_terminal_orders_are_frozen() {
        let mut order = limit_order(10);
        order.cancel(200).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.remaining_quantity(), 10);

        assert!(order.cancel(300).is_err());
        assert!(order.fill(1, 300).is_err());
        assert!(order.reject(300).is_err());
        assert_eq!(order.updated_at(), 200);
    }

    #[test]
    fn test_reject_only_from_pending() {
        let mut order = limit_order(10);
        order.fill(5, 200).unwrap();
        assert!(order.reject(300).is_err());

        let mut fresh = limit_order(10);
        fresh.reject(300).unwrap();
        assert_eq!(fresh.status(), OrderStatus::Rejected);
    }
}
