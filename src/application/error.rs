/// Application errors
///
/// Everything a command can fail with. Validation and state errors are the
/// caller's fault and leave no trace; persistence errors mean the command
/// was not accepted and nothing changed in memory.
use thiserror::Error;

use crate::domain::order::OrderStateError;
use crate::domain::orderbook::BookError;
use crate::domain::validation::ValidationError;
use crate::infrastructure::persistence::PersistenceError;
use crate::shared::protocol::{OrderId, OrderStatus};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order {order_id} is {status} and can no longer change")]
    InvalidState { order_id: OrderId, status: OrderStatus },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("engine for {expected} received a command for {got}")]
    SymbolMismatch { expected: String, got: String },

    /// The event stream does not describe a reachable state
    #[error("replay failed{}: {reason}", at_suffix(.position))]
    Replay { position: Option<u64>, reason: String },

    #[error("execution lane is closed")]
    LaneClosed,

    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(std::io::Error),
}

fn at_suffix(position: &Option<u64>) -> String {
    position
        .map(|p| format!(" at position {}", p))
        .unwrap_or_default()
}

impl EngineError {
    pub(crate) fn replay(reason: impl Into<String>) -> Self {
        EngineError::Replay {
            position: None,
            reason: reason.into(),
        }
    }

    /// Attaches a log position to a replay error that has none yet
    pub(crate) fn at_position(self, at: u64) -> Self {
        match self {
            EngineError::Replay {
                position: None,
                reason,
            } => EngineError::Replay {
                position: Some(at),
                reason,
            },
            other => other,
        }
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::Persistence(_) => "persistence",
            EngineError::SymbolMismatch { .. } => "symbol_mismatch",
            EngineError::Replay { .. } => "replay",
            EngineError::LaneClosed => "lane_closed",
            EngineError::WorkerSpawn(_) => "worker_spawn",
        }
    }
}

impl From<OrderStateError> for EngineError {
    fn from(e: OrderStateError) -> Self {
        EngineError::replay(e.to_string())
    }
}

impl From<BookError> for EngineError {
    fn from(e: BookError) -> Self {
        EngineError::replay(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_position_attached_once() {
        let err = EngineError::replay("sequence went backwards").at_position(7);
        assert_eq!(
            err.to_string(),
            "replay failed at position 7: sequence went backwards"
        );
        let err = err.at_position(9);
        assert!(matches!(err, EngineError::Replay { position: Some(7), .. }));
    }

    #[test]
    fn test_state_error_message() {
        let err = EngineError::InvalidState {
            order_id: 3,
            status: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "order 3 is cancelled and can no longer change");
        assert_eq!(err.kind(), "invalid_state");
    }
}
