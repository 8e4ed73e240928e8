/// Application Layer - Services
///
/// Orchestrates the domain layer into commands: staging a match, committing
/// its events to the log and applying them. It sees persistence only through
/// the `EventLog` trait.
///
/// ## Modules
/// - `services`: MatchingEngine, Exchange, PartitionedService
/// - `error`: EngineError

pub mod error;
pub mod services;

// Re-export key services
pub use error::EngineError;
pub use services::{
    EngineContext, EngineSnapshot, Exchange, Execution, MatchingEngine, OrderGateway,
    PartitionConfig, PartitionedService,
};
