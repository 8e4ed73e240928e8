/// CLI Interface Module
///
/// Command-line entry point for the engine when run as a standalone process.
///
/// ## Responsibilities
/// - Parse command-line arguments
/// - Open the event log and recover state from it
/// - Build the command surface (`Exchange` or `PartitionedService`)
/// - Process JSON-lines commands, one `OrderAck` line out per line in
///
/// ## Input format
/// ```text
/// {"submit": {"symbol": "BTC/USD", "side": "buy", "type": "limit", "quantity": 100, "price": 5000, "account_id": 1}}
/// {"cancel": {"order_id": 1}}
/// ```
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, warn};

use crate::application::error::EngineError;
use crate::application::services::{
    EngineContext, Exchange, OrderGateway, PartitionConfig, PartitionedService,
};
use crate::domain::validation::{OrderValidator, ValidationConfig};
use crate::infrastructure::persistence::{
    EventLog, FileEventLog, InMemoryEventLog, PersistenceError,
};
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{ClientCommand, OrderStatus};

/// 撮合引擎命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "price-time-engine")]
#[command(version = "0.1.0")]
#[command(about = "价格-时间优先撮合引擎", long_about = None)]
pub struct CliConfig {
    /// 事件日志文件（缺省为内存日志，进程退出即丢失）
    #[arg(short = 'e', long)]
    pub event_log: Option<PathBuf>,

    /// JSON lines 命令文件（缺省读取标准输入）
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// 执行后端
    #[arg(short = 'b', long, default_value = "exchange", value_parser = ["exchange", "partitioned"])]
    pub backend: String,

    /// 分区数量（0表示自动检测CPU核心数，仅 partitioned 后端）
    #[arg(short = 'n', long, default_value_t = 0)]
    pub partitions: usize,

    /// 每个分区的命令队列容量
    #[arg(short = 'q', long, default_value_t = 10_000)]
    pub queue_capacity: usize,

    /// 启用CPU亲和性绑定
    #[arg(long, default_value_t = false)]
    pub cpu_affinity: bool,

    /// 单笔订单最大数量
    #[arg(long)]
    pub max_quantity: Option<u64>,

    /// 允许交易的代码，可重复；为空则不限制
    #[arg(long = "allowed-symbol")]
    pub allowed_symbol: Vec<String>,

    /// 日志级别
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// 结束时向 stderr 输出 Prometheus 指标
    #[arg(long, default_value_t = false)]
    pub print_metrics: bool,

    /// 仅显示配置，不处理命令
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counters for one run over an input stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub commands: u64,
    pub rejected: u64,
    pub errors: u64,
}

/// Runs the CLI application
pub async fn run() -> Result<(), CliError> {
    // 解析命令行参数
    let config = CliConfig::parse();

    // 初始化日志系统
    init_logging(&config.log_level);

    info!("撮合引擎启动");
    info!("配置: {:?}", config);

    if config.dry_run {
        print_banner(&config);
        println!("\nDry-run 模式 - 不处理命令");
        return Ok(());
    }

    let ctx = build_context(&config)?;
    let gateway = build_gateway(&config, ctx)?;

    let summary = match &config.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            process(BufReader::new(file), gateway.as_ref(), &mut tokio::io::stdout()).await?
        }
        None => {
            process(
                BufReader::new(tokio::io::stdin()),
                gateway.as_ref(),
                &mut tokio::io::stdout(),
            )
            .await?
        }
    };

    info!(
        "processed {} commands ({} rejected, {} errors)",
        summary.commands, summary.rejected, summary.errors
    );

    if config.print_metrics {
        eprintln!("{}", METRICS.export());
    }
    Ok(())
}

fn print_banner(config: &CliConfig) {
    println!("========================================");
    println!("  价格-时间优先撮合引擎 v0.1.0");
    println!("========================================");
    println!(
        "事件日志:     {}",
        config
            .event_log
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(内存)".to_string())
    );
    println!("执行后端:     {}", config.backend);
    println!("分区数量:     {}", partition_count(config));
    println!("队列容量:     {}", config.queue_capacity);
    println!("CPU亲和性:    {}", if config.cpu_affinity { "启用" } else { "禁用" });
    println!("日志级别:     {}", config.log_level);
    println!("========================================");
}

fn partition_count(config: &CliConfig) -> usize {
    // 自动检测分区数
    if config.partitions == 0 {
        num_cpus::get()
    } else {
        config.partitions
    }
}

/// Opens the event log and sets up validation from the command line.
pub fn build_context(config: &CliConfig) -> Result<EngineContext, CliError> {
    let log: Arc<dyn EventLog> = match &config.event_log {
        Some(path) => Arc::new(FileEventLog::open(path)?),
        None => Arc::new(InMemoryEventLog::new()),
    };

    let mut validation = ValidationConfig {
        allowed_symbols: config.allowed_symbol.clone(),
        ..ValidationConfig::default()
    };
    if let Some(max_quantity) = config.max_quantity {
        validation.max_quantity = max_quantity;
    }

    Ok(EngineContext::new(log).with_validator(OrderValidator::with_config(validation)))
}

/// Recovers the selected backend from the log in `ctx`.
pub fn build_gateway(
    config: &CliConfig,
    ctx: EngineContext,
) -> Result<Box<dyn OrderGateway>, CliError> {
    let gateway: Box<dyn OrderGateway> = match config.backend.as_str() {
        "partitioned" => {
            let partition_config = PartitionConfig {
                partition_count: partition_count(config),
                queue_capacity: config.queue_capacity,
                enable_cpu_affinity: config.cpu_affinity,
                ..PartitionConfig::default()
            };
            Box::new(PartitionedService::recover(partition_config, ctx)?)
        }
        _ => Box::new(Exchange::recover(ctx)?),
    };
    Ok(gateway)
}

/// Handles one input line. Blank lines and `#` comments produce nothing.
pub fn handle_line(gateway: &dyn OrderGateway, line: &str) -> Option<serde_json::Value> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let command: ClientCommand = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            warn!("unparseable command: {}", e);
            return Some(json!({ "error": e.to_string(), "kind": "parse" }));
        }
    };

    let result = match command {
        ClientCommand::Submit(raw) => gateway.submit_order(raw),
        ClientCommand::Cancel(request) => gateway.cancel_order(request),
    };

    Some(match result {
        Ok(ack) => serde_json::to_value(&ack)
            .unwrap_or_else(|e| json!({ "error": e.to_string(), "kind": "encode" })),
        Err(e) => json!({ "error": e.to_string(), "kind": e.kind() }),
    })
}

/// Reads commands line by line and writes one JSON result per command.
pub async fn process<R, W>(
    reader: R,
    gateway: &dyn OrderGateway,
    out: &mut W,
) -> Result<RunSummary, CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = RunSummary::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let Some(output) = run_blocking(|| handle_line(gateway, &line)) else {
            continue;
        };
        summary.commands += 1;
        if output.get("error").is_some() {
            summary.errors += 1;
        } else if output.get("status") == Some(&json!(OrderStatus::Rejected)) {
            summary.rejected += 1;
        }

        let mut encoded = serde_json::to_vec(&output)?;
        encoded.push(b'\n');
        out.write_all(&encoded).await?;
    }
    out.flush().await?;
    Ok(summary)
}

/// Runs a gateway call that may block on a partition's reply channel.
///
/// On a multi-threaded runtime the worker hands its other tasks off first;
/// a current-thread runtime has nowhere to move them, so the call runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// 初始化日志系统
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // 日志写入 stderr，stdout 只输出回执
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
