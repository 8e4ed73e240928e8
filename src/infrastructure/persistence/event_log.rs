//! Event log interface
//!
//! Durable, ordered record of engine events. The engine appends all events
//! of one command as a single batch and treats the command as accepted only
//! once the batch is durable. Recovery reads the log back from any position.

use parking_lot::Mutex;
use std::io;
use thiserror::Error;

use crate::domain::events::{EngineEvent, LogEntry};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("event log I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("event encoding failed: {0}")]
    Encode(String),

    #[error("event decoding failed at position {position}: {reason}")]
    Decode { position: u64, reason: String },

    #[error("corrupt frame at position {position}: {reason}")]
    Corrupt { position: u64, reason: String },

    #[error("event log unavailable: {0}")]
    Unavailable(String),

    #[error("position {requested} is beyond the end of the log ({end})")]
    OutOfRange { requested: u64, end: u64 },
}

/// Lazy, finite sequence of log entries
pub type EventStream<'a> = Box<dyn Iterator<Item = Result<LogEntry, PersistenceError>> + Send + 'a>;

pub trait EventLog: Send + Sync {
    /// Appends one event, returning its position.
    fn append(&self, event: &EngineEvent) -> Result<u64, PersistenceError> {
        self.append_batch(std::slice::from_ref(event))
    }

    /// Appends all events or none. Returns the position of the first one
    /// (the current end of the log for an empty batch).
    fn append_batch(&self, events: &[EngineEvent]) -> Result<u64, PersistenceError>;

    /// Entries from `position` to the end of the log as of this call.
    fn read_from(&self, position: u64) -> Result<EventStream<'_>, PersistenceError>;

    /// Position the next appended event will get
    fn next_position(&self) -> u64;
}

#[derive(Debug, Default)]
struct MemoryState {
    events: Vec<EngineEvent>,
    fail_appends: usize,
    unavailable: bool,
}

/// Volatile event log for tests and benchmarks, with fault injection
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    state: Mutex<MemoryState>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` appends fail with `Unavailable`
    pub fn fail_next_appends(&self, count: usize) {
        self.state.lock().fail_appends = count;
    }

    /// While set, every append and read fails
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    /// Copy of every event logged so far
    pub fn events(&self) -> Vec<EngineEvent> {
        self.state.lock().events.clone()
    }
}

impl EventLog for InMemoryEventLog {
    fn append_batch(&self, events: &[EngineEvent]) -> Result<u64, PersistenceError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(PersistenceError::Unavailable("log marked unavailable".to_string()));
        }
        if state.fail_appends > 0 {
            state.fail_appends -= 1;
            return Err(PersistenceError::Unavailable("injected append failure".to_string()));
        }
        let first = state.events.len() as u64;
        state.events.extend_from_slice(events);
        Ok(first)
    }

    fn read_from(&self, position: u64) -> Result<EventStream<'_>, PersistenceError> {
        let state = self.state.lock();
        if state.unavailable {
            return Err(PersistenceError::Unavailable("log marked unavailable".to_string()));
        }
        let end = state.events.len() as u64;
        if position > end {
            return Err(PersistenceError::OutOfRange {
                requested: position,
                end,
            });
        }
        let tail = state.events[position as usize..].to_vec();
        Ok(Box::new(tail.into_iter().zip(position..).map(|(event, position)| {
            Ok(LogEntry { position, event })
        })))
    }

    fn next_position(&self) -> u64 {
        self.state.lock().events.len() as u64
    }
}
