/// Persistence - event log implementations
///
/// - `event_log`: the `EventLog` trait and an in-memory log
/// - `codec`: CRC-checked bincode frames
/// - `file_log`: append-only file log built on the codec

pub mod codec;
pub mod event_log;
pub mod file_log;

pub use codec::{Decoded, FrameCodec};
pub use event_log::{EventLog, EventStream, InMemoryEventLog, PersistenceError};
pub use file_log::FileEventLog;
