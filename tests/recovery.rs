use price_time_engine::application::services::{
    EngineContext, Exchange, MatchingEngine, OrderGateway, PartitionConfig, PartitionedService,
};
use price_time_engine::infrastructure::persistence::{EventLog, FileEventLog, InMemoryEventLog};
use price_time_engine::shared::protocol::{NewOrderRequest, OrderId, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tempfile::TempDir;

const SYMBOL: &str = "ETH/USD";

/// 随机驱动一个引擎：限价单、市价单、撤单混合
fn drive(engine: &mut MatchingEngine, seed: u64, commands: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut known: Vec<OrderId> = Vec::new();

    for _ in 0..commands {
        if !known.is_empty() && rng.gen_ratio(1, 6) {
            let order_id = known[rng.gen_range(0..known.len())];
            // 已成交或已撤销的订单返回错误，属于正常情况
            let _ = engine.cancel(order_id);
            continue;
        }
        let side = if rng.gen::<bool>() { Side::Buy } else { Side::Sell };
        let quantity = rng.gen_range(1..=20);
        let request = if rng.gen_ratio(1, 10) {
            NewOrderRequest::market(rng.gen_range(1..=5), SYMBOL, side, quantity)
        } else {
            let price = rng.gen_range(990..=1010);
            NewOrderRequest::limit(rng.gen_range(1..=5), SYMBOL, side, price, quantity)
        };
        let execution = engine.submit(request).unwrap();
        known.push(execution.order.order_id());
    }
}

fn assert_same_state(live: &MatchingEngine, recovered: &MatchingEngine) {
    assert_eq!(live.book_snapshot(), recovered.book_snapshot());
    assert_eq!(live.trades(), recovered.trades());
    assert_eq!(live.last_sequence(), recovered.last_sequence());
    assert_eq!(live.snapshot(), recovered.snapshot());
    recovered.check_integrity().unwrap();
}

#[test]
fn test_replay_from_memory_log_reproduces_state() {
    let log = Arc::new(InMemoryEventLog::new());
    let mut live = MatchingEngine::new(SYMBOL, EngineContext::new(log.clone()));
    drive(&mut live, 7, 400);
    live.check_integrity().unwrap();
    assert!(!live.trades().is_empty());

    let recovered = MatchingEngine::recover(SYMBOL, EngineContext::new(log)).unwrap();
    assert_same_state(&live, &recovered);
}

#[test]
fn test_replay_from_file_log_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.log");

    let live = {
        let log = Arc::new(FileEventLog::open(&path).unwrap());
        let mut engine = MatchingEngine::new(SYMBOL, EngineContext::new(log));
        drive(&mut engine, 11, 250);
        engine
    };

    // 1. 重新打开日志文件，模拟进程重启
    let reopened = Arc::new(FileEventLog::open(&path).unwrap());
    assert_eq!(reopened.next_position(), live.log_position());

    // 2. 从日志恢复，状态必须一致
    let recovered = MatchingEngine::recover(SYMBOL, EngineContext::new(reopened)).unwrap();
    assert_same_state(&live, &recovered);
}

#[test]
fn test_snapshot_plus_tail_matches_full_replay() {
    let log = Arc::new(InMemoryEventLog::new());
    let mut live = MatchingEngine::new(SYMBOL, EngineContext::new(log.clone()));
    drive(&mut live, 3, 150);
    let snapshot = live.snapshot();
    drive(&mut live, 4, 150);

    let from_snapshot =
        MatchingEngine::recover_from_snapshot(snapshot, EngineContext::new(log.clone())).unwrap();
    let from_scratch = MatchingEngine::recover(SYMBOL, EngineContext::new(log)).unwrap();

    assert_same_state(&live, &from_snapshot);
    assert_same_state(&live, &from_scratch);
}

#[test]
fn test_recovered_engine_keeps_issuing_fresh_ids() {
    let log = Arc::new(InMemoryEventLog::new());
    let mut live = MatchingEngine::new(SYMBOL, EngineContext::new(log.clone()));
    drive(&mut live, 21, 100);
    let highest = live.orders().map(|o| o.order_id()).max().unwrap();

    let mut recovered = MatchingEngine::recover(SYMBOL, EngineContext::new(log)).unwrap();
    let next = recovered
        .submit(NewOrderRequest::limit(1, SYMBOL, Side::Buy, 1, 1))
        .unwrap();
    assert!(next.order.order_id() > highest);
    assert!(next.order.sequence() > live.last_sequence());
}

#[test]
fn test_exchange_recovers_every_symbol_from_shared_file_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exchange.log");

    let expected = {
        let log = Arc::new(FileEventLog::open(&path).unwrap());
        let exchange = Exchange::new(EngineContext::new(log));
        for (i, symbol) in ["BTC/USD", "ETH/USD", "SOL/USD"].iter().enumerate() {
            let price = 100 * (i as u64 + 1);
            exchange
                .submit(NewOrderRequest::limit(1, symbol, Side::Sell, price, 10))
                .unwrap();
            exchange
                .submit(NewOrderRequest::limit(2, symbol, Side::Buy, price, 4))
                .unwrap();
            exchange
                .submit(NewOrderRequest::limit(3, symbol, Side::Buy, price - 1, 6))
                .unwrap();
        }
        exchange.snapshots()
    };

    let log = Arc::new(FileEventLog::open(&path).unwrap());
    let recovered = Exchange::recover(EngineContext::new(log)).unwrap();
    assert_eq!(recovered.symbols(), vec!["BTC/USD", "ETH/USD", "SOL/USD"]);
    assert_eq!(recovered.snapshots(), expected);

    let ask = recovered.best_ask("SOL/USD").unwrap();
    assert_eq!(ask.price, 300);
    assert_eq!(ask.quantity, 6);
    assert_eq!(recovered.best_bid("SOL/USD").unwrap().price, 299);
}

#[test]
fn test_partitioned_service_recovers_same_state_as_exchange() {
    let log = Arc::new(InMemoryEventLog::new());
    let exchange = Exchange::new(EngineContext::new(log.clone()));
    for symbol in ["BTC/USD", "ETH/USD", "SOL/USD", "BNB/USD"] {
        exchange
            .submit(NewOrderRequest::limit(1, symbol, Side::Buy, 500, 8))
            .unwrap();
        exchange
            .submit(NewOrderRequest::limit(2, symbol, Side::Sell, 500, 3))
            .unwrap();
    }

    let config = PartitionConfig {
        partition_count: 3,
        enable_cpu_affinity: false,
        ..PartitionConfig::default()
    };
    let service = PartitionedService::recover(config, EngineContext::new(log)).unwrap();
    assert_eq!(service.snapshots().unwrap(), exchange.snapshots());

    // 恢复后撤单仍能路由到正确的分区
    let resting = exchange
        .with_engine("ETH/USD", |engine| engine.book_snapshot().bids[0].orders[0].0)
        .unwrap();
    let cancelled = service.cancel(resting).unwrap();
    assert_eq!(cancelled.remaining_quantity(), 5);
    assert!(service.book_snapshot("ETH/USD").unwrap().unwrap().bids.is_empty());
}
