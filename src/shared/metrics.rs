//! Prometheus Metrics Module
//!
//! 提供撮合核心的性能指标监控
//!
//! ## 指标类型
//! - **Counter**: 订单总数、成交总数、撤单、拒单、持久化错误
//! - **Histogram**: 撮合延迟
//! - **Gauge**: 订单簿挂单数量
//!
//! ## 使用示例
//! ```rust,ignore
//! use price_time_engine::shared::metrics::METRICS;
//!
//! METRICS.orders_total.with_label_values(&["BTC/USD", "buy", "limit"]).inc();
//!
//! let timer = METRICS.matching_duration.with_label_values(&["BTC/USD"]).start_timer();
//! // ... 执行撮合 ...
//! timer.observe_duration();
//! ```

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    /// 全局Metrics实例
    pub static ref METRICS: Metrics = Metrics::new();
}

/// 撮合核心指标
pub struct Metrics {
    /// 接受的订单 (symbol, side, type)
    pub orders_total: CounterVec,

    /// 成交总数
    pub trades_total: CounterVec,

    /// 成交数量累计
    pub traded_quantity_total: CounterVec,

    /// 撤单总数 (symbol, reason)
    pub cancellations_total: CounterVec,

    /// 拒单总数 (symbol, reason)
    pub rejections_total: CounterVec,

    /// 单条命令的撮合+落盘耗时 (秒)
    pub matching_duration: HistogramVec,

    /// 订单簿挂单数量 (symbol, side)
    pub resting_orders: GaugeVec,

    /// 事件日志错误 (operation)
    pub persistence_errors_total: CounterVec,
}

impl Metrics {
    /// 创建新的Metrics实例
    ///
    /// Registration only fails on duplicate names, which the `lazy_static`
    /// singleton rules out.
    fn new() -> Self {
        Self {
            orders_total: register_counter_vec!(
                "price_time_engine_orders_total",
                "Total number of orders accepted",
                &["symbol", "side", "order_type"]
            )
            .expect("orders_total registration"),

            trades_total: register_counter_vec!(
                "price_time_engine_trades_total",
                "Total number of trades executed",
                &["symbol"]
            )
            .expect("trades_total registration"),

            traded_quantity_total: register_counter_vec!(
                "price_time_engine_traded_quantity_total",
                "Cumulative executed quantity in fixed-point units",
                &["symbol"]
            )
            .expect("traded_quantity_total registration"),

            cancellations_total: register_counter_vec!(
                "price_time_engine_cancellations_total",
                "Total number of order cancellations",
                &["symbol", "reason"]
            )
            .expect("cancellations_total registration"),

            rejections_total: register_counter_vec!(
                "price_time_engine_rejections_total",
                "Total number of rejected orders",
                &["symbol", "reason"]
            )
            .expect("rejections_total registration"),

            matching_duration: register_histogram_vec!(
                "price_time_engine_command_duration_seconds",
                "Time to match and durably log one command",
                &["symbol"],
                vec![0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.05]
            )
            .expect("matching_duration registration"),

            resting_orders: register_gauge_vec!(
                "price_time_engine_resting_orders",
                "Orders currently resting in the book",
                &["symbol", "side"]
            )
            .expect("resting_orders registration"),

            persistence_errors_total: register_counter_vec!(
                "price_time_engine_persistence_errors_total",
                "Event log failures",
                &["operation"]
            )
            .expect("persistence_errors_total registration"),
        }
    }

    /// 导出Prometheus格式的指标
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("metrics encoding failed: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
