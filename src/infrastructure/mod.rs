/// Infrastructure Layer - Technical Implementations
///
/// Implementations that touch the outside world. The domain layer never
/// depends on this layer; the application layer only sees the `EventLog`
/// trait.
///
/// ## Modules
/// - `persistence`: Durable, replayable event logs

pub mod persistence;

// Re-export key types
pub use persistence::{EventLog, FileEventLog, InMemoryEventLog, PersistenceError};
