/// Exchange - multi-symbol command surface
///
/// Holds one `MatchingEngine` per symbol, each behind its own mutex. A
/// command locks only its symbol's engine and runs to completion under that
/// lock, so commands for one symbol are strictly serialized while different
/// symbols proceed in parallel. Engines are created the first time a valid
/// request names their symbol.
///
/// Cancels carry only an order id; `routes` maps every accepted order back to
/// its symbol.
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::context::EngineContext;
use super::matching_engine::{EngineSnapshot, Execution, MatchingEngine};
use super::recovery::rebuild_engines;
use super::OrderGateway;
use crate::application::error::EngineError;
use crate::domain::order::Order;
use crate::domain::orderbook::{BookSnapshot, Depth, LevelSummary};
use crate::shared::protocol::{NewOrderRequest, OrderId};

pub struct Exchange {
    ctx: EngineContext,
    engines: RwLock<HashMap<String, Arc<Mutex<MatchingEngine>>>>,
    routes: RwLock<HashMap<OrderId, Arc<str>>>,
}

impl Exchange {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            engines: RwLock::new(HashMap::new()),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuilds all symbols from the event log in `ctx`.
    pub fn recover(ctx: EngineContext) -> Result<Self, EngineError> {
        Self::recover_from_snapshots(ctx, Vec::new())
    }

    /// Rebuilds from per-symbol checkpoints plus the log.
    pub fn recover_from_snapshots(
        ctx: EngineContext,
        snapshots: Vec<EngineSnapshot>,
    ) -> Result<Self, EngineError> {
        let engines = rebuild_engines(&ctx, snapshots)?;
        let exchange = Self::new(ctx);
        {
            let mut routes = exchange.routes.write();
            let mut table = exchange.engines.write();
            for (symbol, engine) in engines {
                let shared: Arc<str> = Arc::from(symbol.as_str());
                for order in engine.orders() {
                    routes.insert(order.order_id(), Arc::clone(&shared));
                }
                table.insert(symbol, Arc::new(Mutex::new(engine)));
            }
            info!(
                "exchange recovered: {} symbols, {} orders",
                table.len(),
                routes.len()
            );
        }
        Ok(exchange)
    }

    /// Engine for `symbol`, created on first use
    fn engine_for(&self, symbol: &str) -> Arc<Mutex<MatchingEngine>> {
        if let Some(engine) = self.engines.read().get(symbol) {
            return Arc::clone(engine);
        }
        let mut engines = self.engines.write();
        Arc::clone(engines.entry(symbol.to_string()).or_insert_with(|| {
            info!("creating engine for {}", symbol);
            Arc::new(Mutex::new(MatchingEngine::new(symbol, self.ctx.clone())))
        }))
    }

    /// Existing engine for `symbol`
    pub fn engine(&self, symbol: &str) -> Option<Arc<Mutex<MatchingEngine>>> {
        self.engines.read().get(symbol).cloned()
    }

    /// Runs `f` against one symbol's engine under its lock.
    pub fn with_engine<R>(&self, symbol: &str, f: impl FnOnce(&MatchingEngine) -> R) -> Option<R> {
        let engine = self.engine(symbol)?;
        let guard = engine.lock();
        Some(f(&guard))
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.engines.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn best_bid(&self, symbol: &str) -> Option<LevelSummary> {
        self.with_engine(symbol, |e| e.best_bid()).flatten()
    }

    pub fn best_ask(&self, symbol: &str) -> Option<LevelSummary> {
        self.with_engine(symbol, |e| e.best_ask()).flatten()
    }

    pub fn depth(&self, symbol: &str, levels: usize) -> Option<Depth> {
        self.with_engine(symbol, |e| e.depth(levels))
    }

    pub fn book_snapshot(&self, symbol: &str) -> Option<BookSnapshot> {
        self.with_engine(symbol, MatchingEngine::book_snapshot)
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        let symbol = self.routes.read().get(&order_id).cloned()?;
        self.with_engine(&symbol, |e| e.order(order_id).cloned()).flatten()
    }

    /// Checkpoints of every symbol, sorted by symbol
    pub fn snapshots(&self) -> Vec<EngineSnapshot> {
        self.symbols()
            .iter()
            .filter_map(|symbol| self.with_engine(symbol, MatchingEngine::snapshot))
            .collect()
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }
}

impl OrderGateway for Exchange {
    fn submit(&self, request: NewOrderRequest) -> Result<Execution, EngineError> {
        // 先校验，避免为非法代码创建引擎
        self.ctx.validator.validate(&request)?;

        let engine = self.engine_for(&request.symbol);
        let mut engine = engine.lock();
        let execution = engine.submit(request)?;
        if !execution.duplicate {
            self.routes
                .write()
                .insert(execution.order.order_id(), Arc::from(engine.symbol()));
        }
        Ok(execution)
    }

    fn cancel(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let symbol = self
            .routes
            .read()
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))?;
        let engine = self.engine(&symbol).ok_or(EngineError::NotFound(order_id))?;
        let mut engine = engine.lock();
        engine.cancel(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryEventLog;
    use crate::shared::protocol::{CancelOrderRequest, OrderStatus, Side, SubmitOrder};

    fn exchange() -> (Exchange, Arc<InMemoryEventLog>) {
        let log = Arc::new(InMemoryEventLog::new());
        (Exchange::new(EngineContext::new(log.clone())), log)
    }

    fn raw(symbol: &str, side: &str, order_type: &str, quantity: u64, price: u64) -> SubmitOrder {
        SubmitOrder {
            symbol: symbol.to_string(),
            side: side.to_string(),
            order_type: order_type.to_string(),
            quantity,
            price,
            account_id: 1,
            client_request_id: None,
        }
    }

    #[test]
    fn test_symbols_are_isolated() {
        let (exchange, _) = exchange();
        exchange.submit(NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 100, 5)).unwrap();
        let eth = exchange
            .submit(NewOrderRequest::limit(1, "ETH/USD", Side::Sell, 100, 5))
            .unwrap();
        assert!(eth.trades.is_empty());
        assert_eq!(exchange.symbols(), vec!["BTC/USD".to_string(), "ETH/USD".to_string()]);
        assert_eq!(exchange.best_bid("BTC/USD").unwrap().price, 100);
        assert!(exchange.best_bid("ETH/USD").is_none());
    }

    #[test]
    fn test_order_ids_unique_across_symbols() {
        let (exchange, _) = exchange();
        let a = exchange.submit(NewOrderRequest::limit(1, "A", Side::Buy, 1, 1)).unwrap();
        let b = exchange.submit(NewOrderRequest::limit(1, "B", Side::Buy, 1, 1)).unwrap();
        assert_ne!(a.order.order_id(), b.order.order_id());
    }

    #[test]
    fn test_cancel_routes_by_order_id() {
        let (exchange, _) = exchange();
        let order = exchange
            .submit(NewOrderRequest::limit(1, "ETH/USD", Side::Buy, 100, 5))
            .unwrap()
            .order;
        let cancelled = exchange.cancel(order.order_id()).unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert!(matches!(exchange.cancel(12345), Err(EngineError::NotFound(12345))));
        assert_eq!(
            exchange.order(order.order_id()).unwrap().status(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn test_string_surface() {
        let (exchange, log) = exchange();
        let ack = exchange.submit_order(raw("BTC/USD", "hold", "limit", 1, 1)).unwrap();
        assert_eq!(ack.status, OrderStatus::Rejected);
        assert!(ack.order_id.is_none());
        assert!(ack.reason.unwrap().contains("hold"));

        let ack = exchange.submit_order(raw("", "buy", "limit", 1, 1)).unwrap();
        assert_eq!(ack.status, OrderStatus::Rejected);
        assert!(exchange.symbols().is_empty());
        assert!(log.is_empty());

        let rest = exchange.submit_order(raw("BTC/USD", "SELL", "Limit", 10, 500)).unwrap();
        assert_eq!(rest.status, OrderStatus::Pending);
        let taker = exchange.submit_order(raw("BTC/USD", "buy", "MARKET", 4, 0)).unwrap();
        assert_eq!(taker.status, OrderStatus::Filled);
        assert_eq!(taker.trades.len(), 1);
        assert_eq!(taker.trades[0].price, 500);

        let ack = exchange
            .cancel_order(CancelOrderRequest {
                order_id: rest.order_id.unwrap(),
            })
            .unwrap();
        assert_eq!(ack.status, OrderStatus::Cancelled);
        assert_eq!(ack.remaining_quantity, 6);
        assert_eq!(ack.filled_quantity, 4);
    }

    #[test]
    fn test_recover_rebuilds_all_symbols_and_routes() {
        let (exchange, log) = exchange();
        exchange.submit(NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 100, 5)).unwrap();
        let eth = exchange
            .submit(NewOrderRequest::limit(1, "ETH/USD", Side::Sell, 300, 2))
            .unwrap();
        exchange.submit(NewOrderRequest::limit(2, "BTC/USD", Side::Sell, 100, 2)).unwrap();

        let recovered = Exchange::recover(EngineContext::new(log.clone())).unwrap();
        assert_eq!(recovered.snapshots(), exchange.snapshots());
        recovered.cancel(eth.order.order_id()).unwrap();

        let next = recovered
            .submit(NewOrderRequest::limit(3, "SOL/USD", Side::Buy, 1, 1))
            .unwrap();
        assert!(next.order.order_id() > eth.order.order_id());
    }

    #[test]
    fn test_recover_from_partial_checkpoints() {
        let (exchange, log) = exchange();
        exchange.submit(NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 100, 5)).unwrap();
        exchange.submit(NewOrderRequest::limit(1, "ETH/USD", Side::Buy, 100, 5)).unwrap();
        let btc = exchange.with_engine("BTC/USD", MatchingEngine::snapshot).unwrap();
        exchange.submit(NewOrderRequest::limit(1, "BTC/USD", Side::Sell, 100, 3)).unwrap();

        let recovered =
            Exchange::recover_from_snapshots(EngineContext::new(log.clone()), vec![btc]).unwrap();
        assert_eq!(recovered.snapshots(), exchange.snapshots());
    }
}
