/// 引擎运行上下文
///
/// The collaborators every `MatchingEngine` needs: where events are logged,
/// where order ids come from, how time is read and which rules incoming
/// requests must pass. Cloning shares the log, the id counter and the clock.
use std::sync::Arc;

use crate::domain::validation::OrderValidator;
use crate::infrastructure::persistence::{EventLog, InMemoryEventLog};
use crate::shared::ids::OrderIdAllocator;
use crate::shared::timestamp::{Clock, SystemClock};

#[derive(Clone)]
pub struct EngineContext {
    pub log: Arc<dyn EventLog>,
    pub ids: OrderIdAllocator,
    pub clock: Arc<dyn Clock>,
    pub validator: OrderValidator,
}

impl EngineContext {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            ids: OrderIdAllocator::new(),
            clock: Arc::new(SystemClock),
            validator: OrderValidator::new(),
        }
    }

    /// Context over a fresh volatile log
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEventLog::new()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_validator(mut self, validator: OrderValidator) -> Self {
        self.validator = validator;
        self
    }
}
