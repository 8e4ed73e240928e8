/// 订单ID分配器
///
/// One allocator is shared by every symbol lane of a process so order ids
/// stay globally unique without a lock. Gaps are allowed: an id taken by a
/// command whose log append failed is simply never used.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::shared::protocol::OrderId;

#[derive(Debug, Clone)]
pub struct OrderIdAllocator {
    next: Arc<AtomicU64>,
}

impl OrderIdAllocator {
    /// Ids start at 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: OrderId) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    #[inline]
    pub fn allocate(&self) -> OrderId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Moves the counter past an id seen during recovery
    #[inline]
    pub fn observe(&self, used: OrderId) {
        self.next.fetch_max(used.saturating_add(1), Ordering::Relaxed);
    }

    /// The id the next `allocate` will return
    pub fn peek(&self) -> OrderId {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for OrderIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
