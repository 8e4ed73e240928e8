// 全局内存分配器：使用 jemalloc 提升性能
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// 分层架构：domain <- application -> infrastructure, interfaces 在最外层
// shared 放枚举、ID、时钟和指标；shared::protocol 的命令与应答类型引用 domain 的 Trade 和 ValidationError
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use application::{EngineError, Exchange, MatchingEngine, OrderGateway, PartitionedService};
pub use domain::{Order, OrderBook, Trade};
