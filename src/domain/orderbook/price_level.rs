/// 价格档位
///
/// All resting orders at one exact price on one side. The FIFO queue is a
/// doubly linked list threaded through the book's node arena: the level only
/// stores the head/tail slots, every node stores its `prev`/`next`. Appending
/// and unlinking are O(1) and a partially filled head keeps its position.
use serde::{Deserialize, Serialize};

use crate::shared::protocol::{OrderId, Side};

/// 订单簿中的一个节点，代表一个挂单
#[derive(Debug, Clone)]
pub(crate) struct BookNode {
    pub order_id: OrderId,
    pub side: Side,
    pub price: u64,
    /// Open quantity still resting
    pub quantity: u64,
    // 同一价格队列中的上一个/下一个订单
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: u64,
    // 链表头（最早的订单）
    pub(crate) head: Option<usize>,
    // 链表尾
    pub(crate) tail: Option<usize>,
    total_quantity: u64,
    order_count: usize,
}

impl PriceLevel {
    pub(crate) fn new(price: u64) -> Self {
        Self {
            price,
            head: None,
            tail: None,
            total_quantity: 0,
            order_count: 0,
        }
    }

    #[inline]
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Sum of open quantity of every order at this level
    #[inline]
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Links `slot` at the tail. Caller has already written the node.
    pub(crate) fn push_back(&mut self, nodes: &mut [BookNode], slot: usize) {
        let quantity = nodes[slot].quantity;
        nodes[slot].next = None;
        nodes[slot].prev = self.tail;

        match self.tail {
            Some(tail) => nodes[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.total_quantity += quantity;
        self.order_count += 1;
    }

    /// Unlinks `slot` and removes its open quantity from the aggregate.
    pub(crate) fn unlink(&mut self, nodes: &mut [BookNode], slot: usize) {
        let (prev, next, quantity) = {
            let node = &nodes[slot];
            (node.prev, node.next, node.quantity)
        };

        match prev {
            Some(p) => nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => nodes[n].prev = prev,
            None => self.tail = prev,
        }

        nodes[slot].prev = None;
        nodes[slot].next = None;
        self.total_quantity -= quantity;
        self.order_count -= 1;
    }

    /// Shrinks the aggregate after a partial fill of a member order.
    pub(crate) fn reduce(&mut self, quantity: u64) {
        self.total_quantity -= quantity;
    }
}

/// Read-only view of one level, with FIFO iteration over its orders
#[derive(Clone, Copy)]
pub struct LevelView<'a> {
    pub(crate) level: &'a PriceLevel,
    pub(crate) nodes: &'a [BookNode],
}

impl<'a> LevelView<'a> {
    #[inline]
    pub fn price(&self) -> u64 {
        self.level.price()
    }

    #[inline]
    pub fn total_quantity(&self) -> u64 {
        self.level.total_quantity()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.level.order_count()
    }

    /// `(order_id, open_quantity)` from earliest to latest
    pub fn orders(&self) -> LevelOrders<'a> {
        LevelOrders {
            nodes: self.nodes,
            cursor: self.level.head,
        }
    }
}

pub struct LevelOrders<'a> {
    nodes: &'a [BookNode],
    cursor: Option<usize>,
}

impl<'a> Iterator for LevelOrders<'a> {
    type Item = (OrderId, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = &self.nodes[slot];
        self.cursor = node.next;
        Some((node.order_id, node.quantity))
    }
}

/// Aggregated top-of-book / depth entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub price: u64,
    pub quantity: u64,
    pub order_count: usize,
}

impl From<&PriceLevel> for LevelSummary {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price(),
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        }
    }
}
