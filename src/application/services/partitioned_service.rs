/// Partitioned Service - Multi-threaded Matching Lanes
///
/// Each symbol is hashed to one of N partitions. A partition is a worker
/// thread that exclusively owns the engines of its symbols and drains a
/// bounded crossbeam channel of commands, so one symbol's commands run
/// strictly in arrival order without any lock around the book.
///
/// ## Architecture
/// - **Partitioning**: a symbol always routes to the same partition
/// - **Request/reply**: each command carries a reply channel; `submit` and
///   `cancel` block until the worker has committed and applied it
/// - **Cancel routing**: a shared map from order id to partition
/// - **CPU Affinity**: optional core pinning (`cpu-affinity` feature)
/// - **Batch Processing**: workers drain up to `batch_size` queued commands
///   per wakeup
///
/// ## Usage
/// ```rust
/// use price_time_engine::application::services::{
///     EngineContext, OrderGateway, PartitionConfig, PartitionedService,
/// };
/// use price_time_engine::shared::protocol::{NewOrderRequest, Side};
///
/// let config = PartitionConfig { partition_count: 2, ..PartitionConfig::default() };
/// let service = PartitionedService::new(config, EngineContext::in_memory()).unwrap();
/// let execution = service
///     .submit(NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 5000, 10))
///     .unwrap();
/// assert!(execution.trades.is_empty());
/// ```
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

use super::context::EngineContext;
use super::matching_engine::{EngineSnapshot, Execution, MatchingEngine};
use super::recovery::rebuild_engines;
use super::OrderGateway;
use crate::application::error::EngineError;
use crate::domain::order::Order;
use crate::domain::orderbook::BookSnapshot;
use crate::domain::validation::OrderValidator;
use crate::shared::protocol::{NewOrderRequest, OrderId};

/// Configuration for the partitioned service
#[derive(Clone, Debug)]
pub struct PartitionConfig {
    /// Number of partitions (recommended: number of CPU cores)
    pub partition_count: usize,

    /// Queue capacity per partition
    pub queue_capacity: usize,

    /// Maximum commands drained per wakeup
    pub batch_size: usize,

    /// Enable CPU core affinity binding
    pub enable_cpu_affinity: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            partition_count: num_cpus::get(),
            queue_capacity: 10_000,
            batch_size: 100,
            enable_cpu_affinity: true,
        }
    }
}

/// Statistics for a partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub partition_id: usize,
    pub commands_processed: u64,
    pub trades_generated: u64,
    pub symbols: usize,
    pub queue_depth: usize,
}

enum Command {
    Submit {
        request: NewOrderRequest,
        reply: Sender<Result<Execution, EngineError>>,
    },
    Cancel {
        order_id: OrderId,
        reply: Sender<Result<Order, EngineError>>,
    },
    BookSnapshot {
        symbol: String,
        reply: Sender<Option<BookSnapshot>>,
    },
    Snapshots {
        reply: Sender<Vec<EngineSnapshot>>,
    },
    Stats {
        reply: Sender<PartitionStats>,
    },
    Shutdown,
}

/// Worker for a single partition
struct PartitionWorker {
    #[cfg_attr(not(feature = "cpu-affinity"), allow(dead_code))]
    partition_id: usize,
    engines: HashMap<String, MatchingEngine>,
    /// Symbol of every order this partition has accepted
    order_symbols: HashMap<OrderId, String>,
    routes: Arc<RwLock<HashMap<OrderId, usize>>>,
    rx: Receiver<Command>,
    stats: PartitionStats,
    config: PartitionConfig,
    ctx: EngineContext,
}

impl PartitionWorker {
    /// Main processing loop for the partition
    fn run(mut self) {
        // Bind to CPU core if enabled
        if self.config.enable_cpu_affinity {
            #[cfg(feature = "cpu-affinity")]
            {
                if let Some(core_ids) = core_affinity::get_core_ids() {
                    if let Some(core) = core_ids.get(self.partition_id % core_ids.len().max(1)) {
                        core_affinity::set_for_current(*core);
                    }
                }
            }
        }

        loop {
            let first = match self.rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            };

            // 批量取出已排队的命令，减少唤醒次数
            let mut batch = Vec::with_capacity(self.config.batch_size.max(1));
            batch.push(first);
            batch.extend(
                self.rx
                    .try_iter()
                    .take(self.config.batch_size.saturating_sub(1)),
            );

            for command in batch {
                if !self.process(command) {
                    info!("partition {} stopped", self.stats.partition_id);
                    return;
                }
            }

            self.stats.queue_depth = self.rx.len();
        }
        debug!("partition {} channel closed", self.stats.partition_id);
    }

    /// Processes one command; `false` means stop.
    fn process(&mut self, command: Command) -> bool {
        self.stats.commands_processed += 1;
        match command {
            Command::Submit { request, reply } => {
                let symbol = request.symbol.clone();
                let result = self.engine_for(&symbol).submit(request);
                if let Ok(execution) = &result {
                    self.stats.trades_generated += execution.trades.len() as u64;
                    if !execution.duplicate {
                        let order_id = execution.order.order_id();
                        self.order_symbols.insert(order_id, symbol);
                        self.routes.write().insert(order_id, self.stats.partition_id);
                    }
                }
                let _ = reply.send(result);
            }
            Command::Cancel { order_id, reply } => {
                let result = match self
                    .order_symbols
                    .get(&order_id)
                    .and_then(|symbol| self.engines.get_mut(symbol))
                {
                    Some(engine) => engine.cancel(order_id),
                    None => Err(EngineError::NotFound(order_id)),
                };
                let _ = reply.send(result);
            }
            Command::BookSnapshot { symbol, reply } => {
                let _ = reply.send(self.engines.get(&symbol).map(MatchingEngine::book_snapshot));
            }
            Command::Snapshots { reply } => {
                let _ = reply.send(self.engines.values().map(MatchingEngine::snapshot).collect());
            }
            Command::Stats { reply } => {
                let mut stats = self.stats.clone();
                stats.symbols = self.engines.len();
                stats.queue_depth = self.rx.len();
                let _ = reply.send(stats);
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn engine_for(&mut self, symbol: &str) -> &mut MatchingEngine {
        let ctx = &self.ctx;
        self.engines
            .entry(symbol.to_string())
            .or_insert_with(|| MatchingEngine::new(symbol, ctx.clone()))
    }
}

/// Partitioned Matching Service
///
/// Distributes symbols across worker threads, each with its own engines.
/// Commands for the same symbol always go to the same partition.
pub struct PartitionedService {
    /// Sender channels for each partition
    partitions: Vec<Sender<Command>>,

    /// order id -> partition, written by the workers
    routes: Arc<RwLock<HashMap<OrderId, usize>>>,

    validator: OrderValidator,

    /// Configuration
    config: PartitionConfig,

    /// Worker thread handles, joined on drop
    workers: Vec<thread::JoinHandle<()>>,
}

impl PartitionedService {
    /// Starts the workers with empty books
    pub fn new(config: PartitionConfig, ctx: EngineContext) -> Result<Self, EngineError> {
        Self::spawn(config, ctx, HashMap::new())
    }

    /// Rebuilds every symbol from the event log, then starts the workers.
    pub fn recover(config: PartitionConfig, ctx: EngineContext) -> Result<Self, EngineError> {
        Self::recover_from_snapshots(config, ctx, Vec::new())
    }

    pub fn recover_from_snapshots(
        config: PartitionConfig,
        ctx: EngineContext,
        snapshots: Vec<EngineSnapshot>,
    ) -> Result<Self, EngineError> {
        let engines = rebuild_engines(&ctx, snapshots)?;
        Self::spawn(config, ctx, engines)
    }

    fn spawn(
        mut config: PartitionConfig,
        ctx: EngineContext,
        engines: HashMap<String, MatchingEngine>,
    ) -> Result<Self, EngineError> {
        config.partition_count = config.partition_count.max(1);
        let count = config.partition_count;

        // 按分区分配已恢复的引擎
        let routes = Arc::new(RwLock::new(HashMap::new()));
        let mut owned: Vec<HashMap<String, MatchingEngine>> = (0..count).map(|_| HashMap::new()).collect();
        let mut order_symbols: Vec<HashMap<OrderId, String>> = (0..count).map(|_| HashMap::new()).collect();
        {
            let mut routes = routes.write();
            for (symbol, engine) in engines {
                let partition_id = Self::partition_for(&symbol, count);
                for order in engine.orders() {
                    routes.insert(order.order_id(), partition_id);
                    order_symbols[partition_id].insert(order.order_id(), symbol.clone());
                }
                owned[partition_id].insert(symbol, engine);
            }
        }

        let mut partitions = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);

        // Create workers for each partition
        for (partition_id, (engines, order_symbols)) in owned.into_iter().zip(order_symbols).enumerate() {
            let (tx, rx) = bounded(config.queue_capacity);
            partitions.push(tx);

            let worker = PartitionWorker {
                partition_id,
                engines,
                order_symbols,
                routes: Arc::clone(&routes),
                rx,
                stats: PartitionStats {
                    partition_id,
                    ..PartitionStats::default()
                },
                config: config.clone(),
                ctx: ctx.clone(),
            };

            // Spawn worker thread
            let handle = thread::Builder::new()
                .name(format!("partition-{}", partition_id))
                .spawn(move || worker.run())
                .map_err(EngineError::WorkerSpawn)?;

            workers.push(handle);
        }

        info!("partitioned service started with {} partitions", count);

        Ok(Self {
            partitions,
            routes,
            validator: ctx.validator.clone(),
            config,
            workers,
        })
    }

    /// Routes a symbol to its partition
    ///
    /// Uses DefaultHasher so the same symbol always maps to the same
    /// partition for a given partition count.
    #[inline]
    fn partition_for(symbol: &str, partition_count: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        (hasher.finish() as usize) % partition_count
    }

    fn request<T>(
        &self,
        partition_id: usize,
        make: impl FnOnce(Sender<T>) -> Command,
    ) -> Result<Receiver<T>, EngineError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.partitions[partition_id]
            .send(make(reply_tx))
            .map_err(|_| EngineError::LaneClosed)?;
        Ok(reply_rx)
    }

    fn call<T>(
        &self,
        partition_id: usize,
        make: impl FnOnce(Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        self.request(partition_id, make)?
            .recv()
            .map_err(|_| EngineError::LaneClosed)
    }

    /// Submits a batch of orders
    ///
    /// All commands are queued before any reply is awaited, so partitions
    /// work on the batch in parallel. Results come back in request order.
    pub fn submit_batch(&self, requests: Vec<NewOrderRequest>) -> Vec<Result<Execution, EngineError>> {
        let pending: Vec<Result<Receiver<Result<Execution, EngineError>>, EngineError>> = requests
            .into_iter()
            .map(|request| {
                self.validator.validate(&request)?;
                let partition_id = Self::partition_for(&request.symbol, self.config.partition_count);
                self.request(partition_id, |reply| Command::Submit { request, reply })
            })
            .collect();

        pending
            .into_iter()
            .map(|receiver| {
                receiver?
                    .recv()
                    .map_err(|_| EngineError::LaneClosed)?
            })
            .collect()
    }

    pub fn book_snapshot(&self, symbol: &str) -> Result<Option<BookSnapshot>, EngineError> {
        let partition_id = Self::partition_for(symbol, self.config.partition_count);
        self.call(partition_id, |reply| Command::BookSnapshot {
            symbol: symbol.to_string(),
            reply,
        })
    }

    /// Checkpoints of every symbol, sorted by symbol
    pub fn snapshots(&self) -> Result<Vec<EngineSnapshot>, EngineError> {
        let mut all = Vec::new();
        for partition_id in 0..self.partitions.len() {
            all.extend(self.call(partition_id, |reply| Command::Snapshots { reply })?);
        }
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(all)
    }

    pub fn stats(&self) -> Result<Vec<PartitionStats>, EngineError> {
        (0..self.partitions.len())
            .map(|partition_id| self.call(partition_id, |reply| Command::Stats { reply }))
            .collect()
    }

    /// Gets the number of partitions
    pub fn partition_count(&self) -> usize {
        self.config.partition_count
    }
}

impl OrderGateway for PartitionedService {
    fn submit(&self, request: NewOrderRequest) -> Result<Execution, EngineError> {
        self.validator.validate(&request)?;
        let partition_id = Self::partition_for(&request.symbol, self.config.partition_count);
        self.call(partition_id, |reply| Command::Submit { request, reply })?
    }

    fn cancel(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let partition_id = self
            .routes
            .read()
            .get(&order_id)
            .copied()
            .ok_or(EngineError::NotFound(order_id))?;
        self.call(partition_id, |reply| Command::Cancel { order_id, reply })?
    }
}

impl Drop for PartitionedService {
    fn drop(&mut self) {
        for partition in &self.partitions {
            let _ = partition.send(Command::Shutdown);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
