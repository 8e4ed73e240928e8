/// Matching Engine - one instrument
///
/// Owns the book, the order arena and the trade history of a single symbol
/// and is the only thing that mutates them. Every command runs in three
/// stages:
///
/// 1. **Stage**: validate, then plan the fills against an immutable view of
///    the book and turn the outcome into a batch of `EngineEvent`s.
/// 2. **Commit**: append the batch to the event log. If this fails the
///    command is not accepted and no in-memory state has changed.
/// 3. **Apply**: feed the committed events through `apply`, the same
///    function recovery uses, so live state and replayed state cannot drift.
///
/// Within the symbol, a single `sequence` counter orders acceptances and
/// trades; it is the only tie-breaker the book ever uses.
///
/// ## Usage
/// ```rust
/// use price_time_engine::application::services::{EngineContext, MatchingEngine};
/// use price_time_engine::shared::protocol::{NewOrderRequest, OrderStatus, Side};
///
/// let mut engine = MatchingEngine::new("BTC/USD", EngineContext::in_memory());
/// engine.submit(NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 5000, 100)).unwrap();
/// let fill = engine.submit(NewOrderRequest::limit(2, "BTC/USD", Side::Sell, 5000, 100)).unwrap();
/// assert_eq!(fill.order.status(), OrderStatus::Filled);
/// assert_eq!(fill.trades[0].price, 5000);
/// ```
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::context::EngineContext;
use crate::application::error::EngineError;
use crate::domain::events::{CancelReason, EngineEvent, LogEntry};
use crate::domain::matching::plan_match;
use crate::domain::order::Order;
use crate::domain::orderbook::{BookSnapshot, Depth, LevelSummary, MarketView, OrderBook};
use crate::domain::store::OrderStore;
use crate::domain::trade::Trade;
use crate::domain::validation::ValidationError;
use crate::infrastructure::persistence::PersistenceError;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{
    NewOrderRequest, OrderAck, OrderId, OrderStatus, OrderType, Sequence, Side, TradeId,
};
use crate::shared::timestamp::Timestamp;

const NO_LIQUIDITY: &str = "no liquidity for market order";
const DUPLICATE_REQUEST: &str = "duplicate client_request_id";

/// Result of a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// The order as it stands once the command completed
    pub order: Order,
    /// Trades in which this order was the taker
    pub trades: Vec<Trade>,
    /// `true` when the request repeated a known `client_request_id`
    pub duplicate: bool,
    pub reason: Option<String>,
}

impl Execution {
    pub fn to_ack(&self) -> OrderAck {
        OrderAck {
            order_id: Some(self.order.order_id()),
            status: self.order.status(),
            filled_quantity: self.order.filled_quantity(),
            remaining_quantity: self.order.remaining_quantity(),
            trades: self.trades.clone(),
            reason: self.reason.clone(),
        }
    }
}

impl From<Execution> for OrderAck {
    fn from(execution: Execution) -> Self {
        OrderAck {
            order_id: Some(execution.order.order_id()),
            status: execution.order.status(),
            filled_quantity: execution.order.filled_quantity(),
            remaining_quantity: execution.order.remaining_quantity(),
            trades: execution.trades,
            reason: execution.reason,
        }
    }
}

/// Serializable image of an engine, used as a recovery checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub symbol: String,
    /// Every accepted order, in acceptance order
    pub orders: Vec<Order>,
    pub book: BookSnapshot,
    pub trades: Vec<Trade>,
    /// Sorted by request id
    pub client_requests: Vec<(String, OrderId)>,
    pub last_sequence: Sequence,
    pub next_trade_id: TradeId,
    /// First log position not covered by this snapshot
    pub log_position: u64,
}

pub struct MatchingEngine {
    symbol: Arc<str>,
    book: OrderBook,
    orders: OrderStore,
    trades: Vec<Trade>,
    client_requests: HashMap<String, OrderId>,
    last_sequence: Sequence,
    next_trade_id: TradeId,
    /// Position after the last log entry this engine has seen
    log_position: u64,
    ctx: EngineContext,
}

impl MatchingEngine {
    pub fn new(symbol: impl Into<Arc<str>>, ctx: EngineContext) -> Self {
        Self {
            symbol: symbol.into(),
            book: OrderBook::with_capacity(1024),
            orders: OrderStore::new(),
            trades: Vec::new(),
            client_requests: HashMap::new(),
            last_sequence: 0,
            next_trade_id: 1,
            log_position: 0,
            ctx,
        }
    }

    /// Rebuilds the engine for `symbol` from the whole event log in `ctx`.
    pub fn recover(symbol: impl Into<Arc<str>>, ctx: EngineContext) -> Result<Self, EngineError> {
        let mut engine = Self::new(symbol, ctx);
        let log = Arc::clone(&engine.ctx.log);
        let applied = engine.replay(log.read_from(0)?)?;
        info!(
            "recovered {} from event log: {} events, {} orders, {} resting",
            engine.symbol,
            applied,
            engine.orders.len(),
            engine.book.len()
        );
        Ok(engine)
    }

    /// Restores a checkpoint, then replays the log from where it ends.
    pub fn recover_from_snapshot(
        snapshot: EngineSnapshot,
        ctx: EngineContext,
    ) -> Result<Self, EngineError> {
        let mut engine = Self::from_snapshot(snapshot, ctx)?;
        let log = Arc::clone(&engine.ctx.log);
        let applied = engine.replay(log.read_from(engine.log_position)?)?;
        info!(
            "recovered {} from snapshot plus {} events",
            engine.symbol, applied
        );
        Ok(engine)
    }

    // ==================== Commands ====================

    /// Submits a new order.
    ///
    /// Validation failures are returned as `EngineError::Validation` and
    /// leave no trace in the log. A repeated `client_request_id` returns the
    /// original order and its trades instead of trading again.
    pub fn submit(&mut self, request: NewOrderRequest) -> Result<Execution, EngineError> {
        if let Err(e) = self.ctx.validator.validate(&request) {
            METRICS
                .rejections_total
                .with_label_values(&[&*self.symbol, "validation"])
                .inc();
            return Err(e.into());
        }
        if request.symbol.as_str() != &*self.symbol {
            return Err(EngineError::SymbolMismatch {
                expected: self.symbol.to_string(),
                got: request.symbol,
            });
        }
        if let Some(&order_id) = request
            .client_request_id
            .as_ref()
            .and_then(|key| self.client_requests.get(key))
        {
            debug!("{}: duplicate request resolves to order {}", self.symbol, order_id);
            return self.duplicate_of(order_id);
        }

        let started = Instant::now();
        let now = self.ctx.clock.now();
        let order_id = self.ctx.ids.allocate();

        let events = self.stage_submit(order_id, &request, now)?;
        let first = self.commit(&events)?;
        self.apply_committed(&events, first)?;

        let order = self
            .orders
            .get(order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))?;
        let trades: Vec<Trade> = events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::TradeExecuted { trade } => Some(trade.clone()),
                _ => None,
            })
            .collect();
        let reason = match order.status() {
            OrderStatus::Rejected => Some(NO_LIQUIDITY.to_string()),
            OrderStatus::Cancelled => Some(CancelReason::MarketRemainder.as_str().to_string()),
            _ => None,
        };

        self.record_submit(&order, &trades, started);
        Ok(Execution {
            order,
            trades,
            duplicate: false,
            reason,
        })
    }

    /// Cancels a resting order.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        let order = self
            .orders
            .get(order_id)
            .ok_or(EngineError::NotFound(order_id))?;
        if order.is_terminal() {
            return Err(EngineError::InvalidState {
                order_id,
                status: order.status(),
            });
        }

        let event = EngineEvent::OrderCancelled {
            symbol: self.symbol.to_string(),
            order_id,
            reason: CancelReason::UserRequested,
            remaining_quantity: order.remaining_quantity(),
            timestamp: self.ctx.clock.now(),
        };
        let first = self.commit(std::slice::from_ref(&event))?;
        self.apply_committed(std::slice::from_ref(&event), first)?;

        METRICS
            .cancellations_total
            .with_label_values(&[&*self.symbol, CancelReason::UserRequested.as_str()])
            .inc();
        self.refresh_gauges();
        debug!("{}: order {} cancelled", self.symbol, order_id);

        self.orders
            .get(order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))
    }

    fn duplicate_of(&self, order_id: OrderId) -> Result<Execution, EngineError> {
        let order = self
            .orders
            .get(order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))?;
        let trades = self
            .trades
            .iter()
            .filter(|t| t.taker_order_id == order_id)
            .cloned()
            .collect();
        Ok(Execution {
            order,
            trades,
            duplicate: true,
            reason: Some(DUPLICATE_REQUEST.to_string()),
        })
    }

    /// Plans the whole outcome of a submit as events, without mutating.
    fn stage_submit(
        &self,
        order_id: OrderId,
        request: &NewOrderRequest,
        now: Timestamp,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let price = match request.order_type {
            OrderType::Limit => request.price,
            OrderType::Market => 0,
        };
        let plan = plan_match(
            &self.book,
            request.side,
            request.order_type,
            price,
            request.quantity,
        );

        // 挂单前检查总量，越界的订单在写日志前拒绝
        if request.order_type == OrderType::Limit
            && plan.remaining > 0
            && !self.book.can_rest(request.side, plan.remaining)
        {
            METRICS
                .rejections_total
                .with_label_values(&[&*self.symbol, "book_capacity"])
                .inc();
            warn!(
                "{}: {} remainder {} would overflow the book",
                self.symbol, request.side, plan.remaining
            );
            return Err(ValidationError::BookCapacityExceeded {
                side: request.side,
                quantity: plan.remaining,
            }
            .into());
        }

        let mut sequence = self.last_sequence + 1;
        let mut events = Vec::with_capacity(plan.fills.len() + 2);
        events.push(EngineEvent::OrderAccepted {
            order_id,
            account_id: request.account_id,
            symbol: self.symbol.to_string(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price,
            sequence,
            client_request_id: request.client_request_id.clone(),
            timestamp: now,
        });

        for (i, fill) in plan.fills.iter().enumerate() {
            let maker = self.orders.get(fill.maker_order_id).ok_or_else(|| {
                EngineError::replay(format!(
                    "resting order {} missing from order store",
                    fill.maker_order_id
                ))
            })?;
            sequence += 1;
            events.push(EngineEvent::TradeExecuted {
                trade: Trade {
                    trade_id: self.next_trade_id + i as u64,
                    symbol: self.symbol.to_string(),
                    maker_order_id: fill.maker_order_id,
                    taker_order_id: order_id,
                    maker_account_id: maker.account_id(),
                    taker_account_id: request.account_id,
                    taker_side: request.side,
                    price: fill.price,
                    quantity: fill.quantity,
                    timestamp: now,
                    sequence_number: sequence,
                },
            });
        }

        if plan.remaining > 0 {
            let symbol = self.symbol.to_string();
            events.push(match request.order_type {
                OrderType::Limit => EngineEvent::OrderRested {
                    symbol,
                    order_id,
                    price,
                    remaining_quantity: plan.remaining,
                    timestamp: now,
                },
                // 市价单不挂单：无成交则拒绝，部分成交则撤销剩余
                OrderType::Market if plan.fills.is_empty() => EngineEvent::OrderRejected {
                    symbol,
                    order_id,
                    reason: NO_LIQUIDITY.to_string(),
                    timestamp: now,
                },
                OrderType::Market => EngineEvent::OrderCancelled {
                    symbol,
                    order_id,
                    reason: CancelReason::MarketRemainder,
                    remaining_quantity: plan.remaining,
                    timestamp: now,
                },
            });
        }

        Ok(events)
    }

    fn commit(&self, events: &[EngineEvent]) -> Result<u64, EngineError> {
        self.ctx.log.append_batch(events).map_err(|e| {
            METRICS
                .persistence_errors_total
                .with_label_values(&["append"])
                .inc();
            warn!("{}: event log append failed, command dropped: {}", self.symbol, e);
            EngineError::Persistence(e)
        })
    }

    fn apply_committed(&mut self, events: &[EngineEvent], first: u64) -> Result<(), EngineError> {
        for (offset, event) in events.iter().enumerate() {
            let position = first + offset as u64;
            self.apply(event, position)
                .map_err(|e| e.at_position(position))?;
        }
        Ok(())
    }

    fn record_submit(&self, order: &Order, trades: &[Trade], started: Instant) {
        let symbol: &str = &self.symbol;
        METRICS
            .orders_total
            .with_label_values(&[symbol, order.side().as_str(), order.order_type().as_str()])
            .inc();
        if !trades.is_empty() {
            METRICS
                .trades_total
                .with_label_values(&[symbol])
                .inc_by(trades.len() as f64);
            METRICS
                .traded_quantity_total
                .with_label_values(&[symbol])
                .inc_by(trades.iter().map(|t| t.quantity).sum::<u64>() as f64);
        }
        match order.status() {
            OrderStatus::Rejected => {
                METRICS
                    .rejections_total
                    .with_label_values(&[symbol, "no_liquidity"])
                    .inc();
                warn!("{}: market order {} rejected: {}", symbol, order.order_id(), NO_LIQUIDITY);
            }
            OrderStatus::Cancelled => {
                METRICS
                    .cancellations_total
                    .with_label_values(&[symbol, CancelReason::MarketRemainder.as_str()])
                    .inc();
                debug!(
                    "{}: market order {} remainder {} cancelled",
                    symbol,
                    order.order_id(),
                    order.remaining_quantity()
                );
            }
            _ => {}
        }
        self.refresh_gauges();
        METRICS
            .matching_duration
            .with_label_values(&[symbol])
            .observe(started.elapsed().as_secs_f64());
    }

    pub(crate) fn refresh_gauges(&self) {
        for side in [Side::Buy, Side::Sell] {
            METRICS
                .resting_orders
                .with_label_values(&[&*self.symbol, side.as_str()])
                .set(self.book.side_order_count(side) as f64);
        }
    }

    // ==================== Event application ====================

    /// Applies one logged event. Live commands and replay both come through
    /// here; an event that does not fit the current state is a replay error
    /// and is refused before anything is changed.
    pub fn apply(&mut self, event: &EngineEvent, position: u64) -> Result<(), EngineError> {
        if event.symbol() != &*self.symbol {
            return Err(EngineError::SymbolMismatch {
                expected: self.symbol.to_string(),
                got: event.symbol().to_string(),
            });
        }

        match event {
            EngineEvent::OrderAccepted {
                order_id,
                account_id,
                side,
                order_type,
                quantity,
                price,
                sequence,
                client_request_id,
                timestamp,
                ..
            } => {
                if *sequence <= self.last_sequence {
                    return Err(EngineError::replay(format!(
                        "order {} sequence {} not after {}",
                        order_id, sequence, self.last_sequence
                    )));
                }
                if self.orders.contains(*order_id) {
                    return Err(EngineError::replay(format!("order {} accepted twice", order_id)));
                }
                let request = NewOrderRequest {
                    account_id: *account_id,
                    symbol: self.symbol.to_string(),
                    side: *side,
                    order_type: *order_type,
                    quantity: *quantity,
                    price: *price,
                    client_request_id: client_request_id.clone(),
                };
                let order = Order::accept(
                    *order_id,
                    *sequence,
                    Arc::clone(&self.symbol),
                    &request,
                    *timestamp,
                );
                self.orders.insert(order);
                if let Some(key) = client_request_id {
                    self.client_requests.insert(key.clone(), *order_id);
                }
                self.last_sequence = *sequence;
                self.ctx.ids.observe(*order_id);
            }

            EngineEvent::TradeExecuted { trade } => {
                if trade.sequence_number <= self.last_sequence {
                    return Err(EngineError::replay(format!(
                        "trade {} sequence {} not after {}",
                        trade.trade_id, trade.sequence_number, self.last_sequence
                    )));
                }
                let taker_open = self
                    .orders
                    .get(trade.taker_order_id)
                    .map(Order::remaining_quantity)
                    .ok_or_else(|| {
                        EngineError::replay(format!("unknown taker {}", trade.taker_order_id))
                    })?;
                if trade.quantity > taker_open {
                    return Err(EngineError::replay(format!(
                        "trade {} overfills taker {}",
                        trade.trade_id, trade.taker_order_id
                    )));
                }

                // 先减少簿内数量，校验挂单存在且数量足够
                self.book.reduce(trade.maker_order_id, trade.quantity)?;
                if let Some(maker) = self.orders.get_mut(trade.maker_order_id) {
                    maker.fill(trade.quantity, trade.timestamp)?;
                }
                if let Some(taker) = self.orders.get_mut(trade.taker_order_id) {
                    taker.fill(trade.quantity, trade.timestamp)?;
                }

                self.last_sequence = trade.sequence_number;
                self.next_trade_id = self.next_trade_id.max(trade.trade_id + 1);
                self.trades.push(trade.clone());
                debug!(
                    "{}: trade {} {}@{} maker {} taker {}",
                    self.symbol,
                    trade.trade_id,
                    trade.quantity,
                    trade.price,
                    trade.maker_order_id,
                    trade.taker_order_id
                );
            }

            EngineEvent::OrderRested {
                order_id,
                price,
                remaining_quantity,
                ..
            } => {
                let order = self
                    .orders
                    .get(*order_id)
                    .ok_or_else(|| EngineError::replay(format!("unknown order {} rested", order_id)))?;
                if order.price() != *price || order.remaining_quantity() != *remaining_quantity {
                    return Err(EngineError::replay(format!(
                        "order {} rests {}@{}, expected {}@{}",
                        order_id,
                        remaining_quantity,
                        price,
                        order.remaining_quantity(),
                        order.price()
                    )));
                }
                self.book.insert(order)?;
                debug!("{}: order {} rests {}@{}", self.symbol, order_id, remaining_quantity, price);
            }

            EngineEvent::OrderRejected {
                order_id, timestamp, ..
            } => {
                let order = self
                    .orders
                    .get_mut(*order_id)
                    .ok_or_else(|| EngineError::replay(format!("unknown order {} rejected", order_id)))?;
                order.reject(*timestamp)?;
            }

            EngineEvent::OrderCancelled {
                order_id,
                remaining_quantity,
                timestamp,
                ..
            } => {
                let order = self
                    .orders
                    .get_mut(*order_id)
                    .ok_or_else(|| EngineError::replay(format!("unknown order {} cancelled", order_id)))?;
                if order.remaining_quantity() != *remaining_quantity {
                    return Err(EngineError::replay(format!(
                        "order {} cancelled with {} open, log says {}",
                        order_id,
                        order.remaining_quantity(),
                        remaining_quantity
                    )));
                }
                order.cancel(*timestamp)?;
                if let Some(removed) = self.book.remove(*order_id) {
                    debug!(
                        "{}: order {} leaves {} {} with {} open",
                        self.symbol, removed.order_id, removed.side, removed.price, removed.quantity
                    );
                }
            }
        }

        self.log_position = self.log_position.max(position + 1);
        Ok(())
    }

    /// Applies a stream of log entries in order.
    ///
    /// Entries before `log_position` are already reflected and skipped;
    /// entries for other symbols only advance the id allocator. Returns the
    /// number of events applied to this engine.
    pub fn replay<I>(&mut self, entries: I) -> Result<usize, EngineError>
    where
        I: IntoIterator<Item = Result<LogEntry, PersistenceError>>,
    {
        let mut applied = 0;
        for entry in entries {
            let LogEntry { position, event } = entry?;
            if position < self.log_position {
                continue;
            }
            if event.symbol() != &*self.symbol {
                if let EngineEvent::OrderAccepted { order_id, .. } = event {
                    self.ctx.ids.observe(order_id);
                }
                self.log_position = position + 1;
                continue;
            }
            self.apply(&event, position)
                .map_err(|e| e.at_position(position))?;
            applied += 1;
        }
        self.refresh_gauges();
        Ok(applied)
    }

    // ==================== Snapshots ====================

    pub fn snapshot(&self) -> EngineSnapshot {
        let mut client_requests: Vec<(String, OrderId)> = self
            .client_requests
            .iter()
            .map(|(key, &id)| (key.clone(), id))
            .collect();
        client_requests.sort();

        EngineSnapshot {
            symbol: self.symbol.to_string(),
            orders: self.orders.iter().cloned().collect(),
            book: self.book.snapshot(),
            trades: self.trades.clone(),
            client_requests,
            last_sequence: self.last_sequence,
            next_trade_id: self.next_trade_id,
            log_position: self.log_position,
        }
    }

    /// Rebuilds an engine from a checkpoint without reading the log.
    pub fn from_snapshot(snapshot: EngineSnapshot, ctx: EngineContext) -> Result<Self, EngineError> {
        let mut engine = Self::new(snapshot.symbol.as_str(), ctx);

        for order in snapshot.orders {
            if order.symbol() != &*engine.symbol {
                return Err(EngineError::SymbolMismatch {
                    expected: engine.symbol.to_string(),
                    got: order.symbol().to_string(),
                });
            }
            let order_id = order.order_id();
            if !engine.orders.insert(order) {
                return Err(EngineError::replay(format!("order {} appears twice in snapshot", order_id)));
            }
            engine.ctx.ids.observe(order_id);
        }

        // 按快照中的FIFO顺序重建价格档位
        for level in snapshot.book.bids.iter().chain(snapshot.book.asks.iter()) {
            for &(order_id, open) in &level.orders {
                let order = engine.orders.get(order_id).ok_or_else(|| {
                    EngineError::replay(format!("resting order {} missing from snapshot", order_id))
                })?;
                if order.remaining_quantity() != open || order.price() != level.price {
                    return Err(EngineError::replay(format!(
                        "resting order {} disagrees with its order record",
                        order_id
                    )));
                }
                engine.book.insert(order)?;
            }
        }

        engine.trades = snapshot.trades;
        engine.client_requests = snapshot.client_requests.into_iter().collect();
        engine.last_sequence = snapshot.last_sequence;
        engine.next_trade_id = snapshot.next_trade_id;
        engine.log_position = snapshot.log_position;
        engine.refresh_gauges();
        Ok(engine)
    }

    // ==================== Queries ====================

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn best_bid(&self) -> Option<LevelSummary> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<LevelSummary> {
        self.book.best_ask()
    }

    pub fn depth(&self, levels: usize) -> Depth {
        self.book.depth(levels)
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn resting_order_count(&self) -> usize {
        self.book.len()
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn book_snapshot(&self) -> BookSnapshot {
        self.book.snapshot()
    }

    pub fn last_sequence(&self) -> Sequence {
        self.last_sequence
    }

    pub fn log_position(&self) -> u64 {
        self.log_position
    }

    /// Book invariants plus agreement between book and order records
    pub fn check_integrity(&self) -> Result<(), String> {
        self.book.check_integrity()?;
        for order in self.orders.iter() {
            let open = self.book.open_quantity(order.order_id());
            match (order.is_terminal(), open) {
                (true, Some(_)) => {
                    return Err(format!("terminal order {} still rests", order.order_id()))
                }
                (false, None) => {
                    return Err(format!("live order {} is not in the book", order.order_id()))
                }
                (false, Some(open)) if open != order.remaining_quantity() => {
                    return Err(format!("order {} open quantity mismatch", order.order_id()))
                }
                _ => {}
            }
            if (order.remaining_quantity() == 0) != (order.status() == OrderStatus::Filled) {
                return Err(format!("order {} remaining/status mismatch", order.order_id()));
            }
        }
        Ok(())
    }
}

impl MarketView for MatchingEngine {
    fn best_bid_price(&self) -> Option<u64> {
        self.book.best_bid_price()
    }

    fn best_ask_price(&self) -> Option<u64> {
        self.book.best_ask_price()
    }
}
