use price_time_engine::application::services::{
    EngineContext, Exchange, OrderGateway, PartitionConfig, PartitionedService,
};
use price_time_engine::shared::protocol::{NewOrderRequest, OrderId, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// --- 配置 ---
const NUM_CLIENTS: u64 = 8; // 模拟的并发客户端数量
const TEST_DURATION: Duration = Duration::from_secs(10); // 测试持续时间
const SYMBOLS: [&str; 4] = ["BTC/USD", "ETH/USD", "SOL/USD", "BNB/USD"];
const MID_PRICE: u64 = 50_000;

#[derive(Default)]
struct Counters {
    commands: AtomicU64,
    trades: AtomicU64,
    errors: AtomicU64,
    latency_nanos: AtomicU64,
}

fn main() {
    let partitioned = std::env::args().any(|arg| arg == "--partitioned");

    println!("启动吞吐量测试...");
    println!("模拟客户端数量: {}", NUM_CLIENTS);
    println!("测试持续时间: {:?}", TEST_DURATION);
    println!("执行后端: {}", if partitioned { "partitioned" } else { "exchange" });

    let ctx = EngineContext::in_memory();
    let gateway: Arc<dyn OrderGateway> = if partitioned {
        match PartitionedService::new(PartitionConfig::default(), ctx) {
            Ok(service) => Arc::new(service),
            Err(e) => {
                eprintln!("启动分区服务失败: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Arc::new(Exchange::new(ctx))
    };

    let counters = Arc::new(Counters::default());
    let running = Arc::new(AtomicBool::new(true));

    let handles: Vec<_> = (0..NUM_CLIENTS)
        .map(|client_id| {
            let gateway = Arc::clone(&gateway);
            let counters = Arc::clone(&counters);
            let running = Arc::clone(&running);
            thread::spawn(move || run_client(client_id, gateway.as_ref(), &counters, &running))
        })
        .collect();

    // 等待测试结束
    thread::sleep(TEST_DURATION);
    running.store(false, Ordering::Relaxed);
    for handle in handles {
        let _ = handle.join();
    }

    // 测试结束，计算结果
    let commands = counters.commands.load(Ordering::Relaxed);
    let trades = counters.trades.load(Ordering::Relaxed);
    let avg_latency = if commands > 0 {
        counters.latency_nanos.load(Ordering::Relaxed) as f64 / commands as f64
    } else {
        0.0
    };

    println!("\n--- 测试结果 ---");
    println!("总命令数: {}", commands);
    println!("总撮合交易数: {}", trades);
    println!("错误数: {}", counters.errors.load(Ordering::Relaxed));
    println!("吞吐量 (命令/秒): {:.2}", commands as f64 / TEST_DURATION.as_secs_f64());
    println!("成交量 (TPS): {:.2}", trades as f64 / TEST_DURATION.as_secs_f64());
    println!("平均命令延迟: {:.2} µs", avg_latency / 1000.0);
}

fn run_client(client_id: u64, gateway: &dyn OrderGateway, counters: &Counters, running: &AtomicBool) {
    let mut rng = StdRng::seed_from_u64(client_id);
    let mut resting: Vec<OrderId> = Vec::new();

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();

        // 约十分之一的命令为撤单
        let ok = if !resting.is_empty() && rng.gen_ratio(1, 10) {
            let index = rng.gen_range(0..resting.len());
            let order_id = resting.swap_remove(index);
            // 订单可能已被成交，InvalidState 属于正常结果
            let _ = gateway.cancel(order_id);
            true
        } else {
            let request = random_order(&mut rng, client_id);
            match gateway.submit(request) {
                Ok(execution) => {
                    counters
                        .trades
                        .fetch_add(execution.trades.len() as u64, Ordering::Relaxed);
                    if !execution.order.is_terminal() {
                        resting.push(execution.order.order_id());
                    }
                    true
                }
                Err(_) => false,
            }
        };

        counters.commands.fetch_add(1, Ordering::Relaxed);
        counters
            .latency_nanos
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        if !ok {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn random_order(rng: &mut StdRng, account_id: u64) -> NewOrderRequest {
    let symbol = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
    let side = if rng.gen::<bool>() { Side::Buy } else { Side::Sell };
    let quantity = rng.gen_range(1..=5);

    if rng.gen_ratio(1, 20) {
        return NewOrderRequest::market(account_id, symbol, side, quantity);
    }

    let price = match side {
        Side::Buy => rng.gen_range(MID_PRICE - 10..=MID_PRICE),
        Side::Sell => rng.gen_range(MID_PRICE..=MID_PRICE + 10),
    };
    NewOrderRequest::limit(account_id, symbol, side, price, quantity)
}
