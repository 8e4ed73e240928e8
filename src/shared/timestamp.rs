/// 时间戳模块
///
/// Timestamps are Unix nanoseconds and are recorded for audit only. Time
/// priority inside the book comes from the per-symbol acceptance sequence,
/// because wall-clock readings are neither unique nor guaranteed to increase.
///
/// The engine reads time through the `Clock` trait so tests can pin it.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in nanoseconds
pub type Timestamp = u64;

/// Source of audit timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Timestamp {
        get_precise_timestamp()
    }
}

/// Manually driven clock, every reading advances it by `step`
#[derive(Debug)]
pub struct ManualClock {
    current: AtomicU64,
    step: u64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self::with_step(start, 0)
    }

    pub fn with_step(start: Timestamp, step: u64) -> Self {
        Self {
            current: AtomicU64::new(start),
            step,
        }
    }

    pub fn set(&self, value: Timestamp) {
        self.current.store(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// 获取精确时间戳（无缓存）
#[inline]
pub fn get_precise_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
