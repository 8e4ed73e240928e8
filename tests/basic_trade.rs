use price_time_engine::application::services::{EngineContext, MatchingEngine};
use price_time_engine::domain::events::EngineEvent;
use price_time_engine::infrastructure::persistence::InMemoryEventLog;
use price_time_engine::shared::protocol::{NewOrderRequest, OrderStatus, Side};
use std::sync::Arc;

// 价格精度：两位小数，50.00 = 5000
const SYMBOL: &str = "BTC/USD";

fn engine() -> (MatchingEngine, Arc<InMemoryEventLog>) {
    let log = Arc::new(InMemoryEventLog::new());
    (MatchingEngine::new(SYMBOL, EngineContext::new(log.clone())), log)
}

#[test]
fn test_basic_match() {
    let (mut engine, _) = engine();

    // 1. 买单 100@50.00 挂单
    let buy = engine
        .submit(NewOrderRequest::limit(101, SYMBOL, Side::Buy, 5000, 100))
        .unwrap();
    assert_eq!(buy.order.status(), OrderStatus::Pending);
    assert_eq!(engine.best_bid().unwrap().price, 5000);

    // 2. 卖单 100@50.00 完全成交
    let sell = engine
        .submit(NewOrderRequest::limit(102, SYMBOL, Side::Sell, 5000, 100))
        .unwrap();
    assert_eq!(sell.trades.len(), 1);
    let trade = &sell.trades[0];
    assert_eq!(trade.price, 5000);
    assert_eq!(trade.quantity, 100);
    assert_eq!(trade.buy_order_id(), buy.order.order_id());
    assert_eq!(trade.sell_order_id(), sell.order.order_id());
    assert_eq!(trade.maker_account_id, 101);
    assert_eq!(trade.taker_account_id, 102);

    assert_eq!(sell.order.status(), OrderStatus::Filled);
    assert_eq!(engine.order(buy.order.order_id()).unwrap().status(), OrderStatus::Filled);
    assert!(engine.best_bid().is_none());
    assert!(engine.best_ask().is_none());
}

#[test]
fn test_price_improvement_goes_to_taker() {
    let (mut engine, _) = engine();

    let buy = engine
        .submit(NewOrderRequest::limit(1, SYMBOL, Side::Buy, 5000, 50))
        .unwrap();
    let sell = engine
        .submit(NewOrderRequest::limit(2, SYMBOL, Side::Sell, 4900, 100))
        .unwrap();

    assert_eq!(sell.trades.len(), 1);
    assert_eq!(sell.trades[0].quantity, 50);
    // 成交价为挂单（买单）价格
    assert_eq!(sell.trades[0].price, 5000);

    assert_eq!(engine.order(buy.order.order_id()).unwrap().status(), OrderStatus::Filled);
    assert_eq!(sell.order.status(), OrderStatus::PartiallyFilled);
    assert_eq!(sell.order.remaining_quantity(), 50);

    let ask = engine.best_ask().unwrap();
    assert_eq!(ask.price, 4900);
    assert_eq!(ask.quantity, 50);
    assert!(engine.best_bid().is_none());
}

#[test]
fn test_market_order_on_empty_book() {
    let (mut engine, log) = engine();

    let execution = engine
        .submit(NewOrderRequest::market(1, SYMBOL, Side::Buy, 100))
        .unwrap();
    assert!(execution.trades.is_empty());
    assert_eq!(execution.order.status(), OrderStatus::Rejected);
    assert_eq!(execution.order.filled_quantity(), 0);
    assert_eq!(execution.order.remaining_quantity(), 100);
    assert_eq!(engine.resting_order_count(), 0);
    assert!(matches!(
        log.events().last(),
        Some(EngineEvent::OrderRejected { .. })
    ));
}

#[test]
fn test_cancel_twice_keeps_book_quantity() {
    let (mut engine, _) = engine();
    let keep = engine
        .submit(NewOrderRequest::limit(1, SYMBOL, Side::Buy, 5000, 30))
        .unwrap();
    let gone = engine
        .submit(NewOrderRequest::limit(2, SYMBOL, Side::Buy, 5000, 20))
        .unwrap();

    engine.cancel(gone.order.order_id()).unwrap();
    assert_eq!(engine.best_bid().unwrap().quantity, 30);
    assert!(engine.cancel(gone.order.order_id()).is_err());
    assert_eq!(engine.best_bid().unwrap().quantity, 30);
    assert_eq!(engine.best_bid().unwrap().order_count, 1);
    assert_eq!(engine.order(keep.order.order_id()).unwrap().status(), OrderStatus::Pending);
}

#[test]
fn test_repeated_client_request_id_trades_once() {
    let (mut engine, log) = engine();
    engine
        .submit(NewOrderRequest::limit(1, SYMBOL, Side::Sell, 5000, 100))
        .unwrap();

    let request = NewOrderRequest::limit(2, SYMBOL, Side::Buy, 5000, 40).with_client_request_id("req-1");
    let first = engine.submit(request.clone()).unwrap();
    let logged = log.len();
    let again = engine.submit(request).unwrap();

    assert!(!first.duplicate);
    assert!(again.duplicate);
    assert_eq!(again.order.order_id(), first.order.order_id());
    assert_eq!(again.trades, first.trades);
    assert_eq!(log.len(), logged);
    assert_eq!(engine.best_ask().unwrap().quantity, 60);
}

#[test]
fn test_failed_append_leaves_engine_untouched() {
    let (mut engine, log) = engine();
    engine
        .submit(NewOrderRequest::limit(1, SYMBOL, Side::Sell, 5000, 100))
        .unwrap();
    let before = engine.snapshot();

    // 日志写入失败：命令不生效，状态不变
    log.fail_next_appends(1);
    assert!(engine
        .submit(NewOrderRequest::limit(2, SYMBOL, Side::Buy, 5000, 40))
        .is_err());
    assert_eq!(engine.snapshot(), before);

    // 日志恢复后，同样的命令正常成交
    let retry = engine
        .submit(NewOrderRequest::limit(2, SYMBOL, Side::Buy, 5000, 40))
        .unwrap();
    assert_eq!(retry.trades.len(), 1);
    assert_eq!(engine.best_ask().unwrap().quantity, 60);
}
