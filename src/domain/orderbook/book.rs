use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::price_level::{BookNode, LevelSummary, LevelView, PriceLevel};
use super::traits::MarketView;
use crate::domain::order::Order;
use crate::shared::protocol::{OrderId, OrderType, Side};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("order {0} is already resting")]
    DuplicateOrder(OrderId),

    #[error("order {0} is not resting")]
    UnknownOrder(OrderId),

    #[error("order {order_id}: {reason}")]
    NotRestable { order_id: OrderId, reason: &'static str },

    #[error("order {order_id}: reduce by {requested} exceeds open {open}")]
    Overfill {
        order_id: OrderId,
        requested: u64,
        open: u64,
    },

    #[error("order {order_id}: resting {side} quantity would overflow")]
    QuantityOverflow { order_id: OrderId, side: Side },
}

/// What was taken off the book by `remove`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: u64,
    pub quantity: u64,
}

/// 订单簿核心结构
///
/// Bids iterate best-first from the high end of their map, asks from the low
/// end. Every resting order lives in exactly one node of the arena and is
/// reachable both from its level's FIFO list and from `index`.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    // 买单侧，最优价为最高价
    bids: BTreeMap<u64, PriceLevel>,
    // 卖单侧，最优价为最低价
    asks: BTreeMap<u64, PriceLevel>,
    // 订单节点池
    nodes: Vec<BookNode>,
    // order_id -> 节点索引
    index: HashMap<OrderId, usize>,
    // 空闲节点链表头，复用已删除的节点
    free_list_head: Option<usize>,
    // 每侧挂单总量，任一价位的总量都不超过它
    bid_quantity: u64,
    ask_quantity: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(orders: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(orders),
            index: HashMap::with_capacity(orders),
            ..Self::default()
        }
    }

    /// Number of resting orders
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Open quantity of a resting order
    pub fn open_quantity(&self, order_id: OrderId) -> Option<u64> {
        self.index.get(&order_id).map(|&slot| self.nodes[slot].quantity)
    }

    /// Whether `quantity` more can rest on `side` without overflowing the
    /// side or level aggregates
    pub fn can_rest(&self, side: Side, quantity: u64) -> bool {
        self.side_quantity(side).checked_add(quantity).is_some()
    }

    fn side_total_mut(&mut self, side: Side) -> &mut u64 {
        match side {
            Side::Buy => &mut self.bid_quantity,
            Side::Sell => &mut self.ask_quantity,
        }
    }

    pub fn best_bid(&self) -> Option<LevelSummary> {
        self.bids.values().next_back().map(LevelSummary::from)
    }

    pub fn best_ask(&self) -> Option<LevelSummary> {
        self.asks.values().next().map(LevelSummary::from)
    }

    /// Places the open remainder of a limit order at the tail of its level.
    pub fn insert(&mut self, order: &Order) -> Result<(), BookError> {
        let order_id = order.order_id();
        if order.order_type() != OrderType::Limit {
            return Err(BookError::NotRestable {
                order_id,
                reason: "market orders never rest",
            });
        }
        if order.remaining_quantity() == 0 || order.is_terminal() {
            return Err(BookError::NotRestable {
                order_id,
                reason: "no open quantity",
            });
        }
        if self.index.contains_key(&order_id) {
            return Err(BookError::DuplicateOrder(order_id));
        }
        let side_total = self
            .side_quantity(order.side())
            .checked_add(order.remaining_quantity())
            .ok_or(BookError::QuantityOverflow {
                order_id,
                side: order.side(),
            })?;

        let node = BookNode {
            order_id,
            side: order.side(),
            price: order.price(),
            quantity: order.remaining_quantity(),
            prev: None,
            next: None,
        };

        // 优先从 free list 中分配节点
        let slot = match self.free_list_head {
            Some(free) => {
                self.free_list_head = self.nodes[free].next;
                self.nodes[free] = node;
                free
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(order_id, slot);
        *self.side_total_mut(order.side()) = side_total;

        let levels = match order.side() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels
            .entry(order.price())
            .or_insert_with(|| PriceLevel::new(order.price()))
            .push_back(&mut self.nodes, slot);
        Ok(())
    }

    /// Takes a resting order off the book, deleting its level if it empties.
    pub fn remove(&mut self, order_id: OrderId) -> Option<RemovedOrder> {
        let slot = self.index.remove(&order_id)?;
        let (side, price, quantity) = {
            let node = &self.nodes[slot];
            (node.side, node.price, node.quantity)
        };

        *self.side_total_mut(side) -= quantity;

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.unlink(&mut self.nodes, slot);
            if level.is_empty() {
                levels.remove(&price);
            }
        }

        // 回收节点
        let node = &mut self.nodes[slot];
        node.quantity = 0;
        node.next = self.free_list_head;
        self.free_list_head = Some(slot);

        Some(RemovedOrder {
            order_id,
            side,
            price,
            quantity,
        })
    }

    /// Reduces a resting order by an executed quantity. The order keeps its
    /// queue position; at zero it is removed. Returns the open remainder.
    pub fn reduce(&mut self, order_id: OrderId, quantity: u64) -> Result<u64, BookError> {
        let slot = *self
            .index
            .get(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        let (side, price, open) = {
            let node = &self.nodes[slot];
            (node.side, node.price, node.quantity)
        };
        if quantity > open {
            return Err(BookError::Overfill {
                order_id,
                requested: quantity,
                open,
            });
        }
        if quantity == open {
            self.remove(order_id);
            return Ok(0);
        }

        *self.side_total_mut(side) -= quantity;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.reduce(quantity);
        }
        self.nodes[slot].quantity = open - quantity;
        Ok(open - quantity)
    }

    /// Best opposing level an incoming order of `taker_side` may trade with.
    ///
    /// `limit` is `None` for market orders (any level qualifies). A buy may
    /// take asks priced at or below its limit, a sell bids at or above it.
    pub fn peek_matchable(&self, taker_side: Side, limit: Option<u64>) -> Option<LevelView<'_>> {
        self.matchable_levels(taker_side, limit).next()
    }

    /// All eligible opposing levels, best price first.
    pub fn matchable_levels(
        &self,
        taker_side: Side,
        limit: Option<u64>,
    ) -> Box<dyn Iterator<Item = LevelView<'_>> + '_> {
        let nodes = self.nodes.as_slice();
        match taker_side {
            Side::Buy => Box::new(
                self.asks
                    .values()
                    .take_while(move |level| limit.map_or(true, |p| level.price() <= p))
                    .map(move |level| LevelView { level, nodes }),
            ),
            Side::Sell => Box::new(
                self.bids
                    .values()
                    .rev()
                    .take_while(move |level| limit.map_or(true, |p| level.price() >= p))
                    .map(move |level| LevelView { level, nodes }),
            ),
        }
    }

    /// Up to `levels` aggregated entries per side, best first
    pub fn depth(&self, levels: usize) -> Depth {
        Depth {
            bids: self.bids.values().rev().take(levels).map(LevelSummary::from).collect(),
            asks: self.asks.values().take(levels).map(LevelSummary::from).collect(),
        }
    }

    /// Total open quantity on one side
    #[inline]
    pub fn side_quantity(&self, side: Side) -> u64 {
        match side {
            Side::Buy => self.bid_quantity,
            Side::Sell => self.ask_quantity,
        }
    }

    /// Number of resting orders on one side
    pub fn side_order_count(&self, side: Side) -> usize {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.values().map(PriceLevel::order_count).sum()
    }

    pub fn is_crossed(&self) -> bool {
        matches!(
            (self.best_bid_price(), self.best_ask_price()),
            (Some(bid), Some(ask)) if bid >= ask
        )
    }

    /// Full structural copy: every level with its FIFO order ids
    pub fn snapshot(&self) -> BookSnapshot {
        let capture = |level: &PriceLevel| {
            let view = LevelView {
                level,
                nodes: &self.nodes,
            };
            LevelSnapshot {
                price: level.price(),
                total_quantity: level.total_quantity(),
                orders: view.orders().collect(),
            }
        };
        BookSnapshot {
            bids: self.bids.values().rev().map(&capture).collect(),
            asks: self.asks.values().map(&capture).collect(),
        }
    }

    /// Verifies the structural invariants: no empty levels, aggregates equal
    /// the sum of their members, every indexed order reachable from exactly
    /// one level of matching side and price, and no crossed book.
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut seen = 0usize;
        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            let mut side_sum = 0u64;
            for (&price, level) in levels {
                if level.is_empty() {
                    return Err(format!("{} level {} is empty", side, price));
                }
                let view = LevelView {
                    level,
                    nodes: &self.nodes,
                };
                let mut sum = 0u64;
                let mut count = 0usize;
                let mut cursor = level.head;
                while let Some(slot) = cursor {
                    let node = &self.nodes[slot];
                    if node.side != side || node.price != price {
                        return Err(format!("order {} misplaced at {} {}", node.order_id, side, price));
                    }
                    if self.index.get(&node.order_id) != Some(&slot) {
                        return Err(format!("order {} missing from index", node.order_id));
                    }
                    if node.quantity == 0 {
                        return Err(format!("order {} rests with zero quantity", node.order_id));
                    }
                    sum = sum
                        .checked_add(node.quantity)
                        .ok_or_else(|| format!("{} level {} quantity overflows", side, price))?;
                    count += 1;
                    cursor = node.next;
                }
                if sum != view.total_quantity() || count != view.order_count() {
                    return Err(format!("{} level {} aggregate mismatch", side, price));
                }
                seen += count;
                side_sum = side_sum
                    .checked_add(sum)
                    .ok_or_else(|| format!("{} side quantity overflows", side))?;
            }
            if side_sum != self.side_quantity(side) {
                return Err(format!("{} side total {} != {}", side, self.side_quantity(side), side_sum));
            }
        }
        if seen != self.index.len() {
            return Err(format!("{} indexed orders, {} linked", self.index.len(), seen));
        }
        if self.is_crossed() {
            return Err("book is crossed".to_string());
        }
        Ok(())
    }
}

impl MarketView for OrderBook {
    fn best_bid_price(&self) -> Option<u64> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask_price(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }
}

/// Aggregated depth, best level first on each side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depth {
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub price: u64,
    pub total_quantity: u64,
    /// `(order_id, open_quantity)` in FIFO order
    pub orders: Vec<(OrderId, u64)>,
}

/// Comparable picture of the book, best level first on each side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::protocol::NewOrderRequest;
    use std::sync::Arc;

    fn limit(id: OrderId, side: Side, price: u64, quantity: u64) -> Order {
        let request = NewOrderRequest::limit(1, "BTC/USD", side, price, quantity);
        Order::accept(id, id, Arc::from("BTC/USD"), &request, 0)
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new();
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert!(book.peek_matchable(Side::Buy, None).is_none());
        assert_eq!(book.spread(), None);
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_best_prices_and_aggregates() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Buy, 99, 5)).unwrap();
        book.insert(&limit(2, Side::Buy, 100, 3)).unwrap();
        book.insert(&limit(3, Side::Buy, 100, 4)).unwrap();
        book.insert(&limit(4, Side::Sell, 102, 8)).unwrap();
        book.insert(&limit(5, Side::Sell, 101, 1)).unwrap();

        let bid = book.best_bid().unwrap();
        assert_eq!((bid.price, bid.quantity, bid.order_count), (100, 7, 2));
        let ask = book.best_ask().unwrap();
        assert_eq!((ask.price, ask.quantity), (101, 1));
        assert_eq!(book.spread(), Some(1));
        assert_eq!(book.side_quantity(Side::Buy), 12);
        assert_eq!(book.side_order_count(Side::Sell), 2);
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = OrderBook::new();
        for id in [7, 3, 9] {
            book.insert(&limit(id, Side::Sell, 50, 1)).unwrap();
        }
        let level = book.peek_matchable(Side::Buy, Some(50)).unwrap();
        let ids: Vec<_> = level.orders().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![7, 3, 9]);
    }

    #[test]
    fn test_remove_middle_and_level_cleanup() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Buy, 10, 1)).unwrap();
        book.insert(&limit(2, Side::Buy, 10, 2)).unwrap();
        book.insert(&limit(3, Side::Buy, 10, 3)).unwrap();

        let removed = book.remove(2).unwrap();
        assert_eq!(removed.quantity, 2);
        assert_eq!(book.best_bid().unwrap().quantity, 4);
        book.check_integrity().unwrap();

        assert!(book.remove(2).is_none());
        book.remove(1);
        book.remove(3);
        assert!(book.best_bid().is_none());
        assert!(book.is_empty());
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_free_list_reuse_keeps_order() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Sell, 10, 1)).unwrap();
        book.insert(&limit(2, Side::Sell, 10, 1)).unwrap();
        book.remove(1);
        book.insert(&limit(3, Side::Sell, 10, 1)).unwrap();

        let ids: Vec<_> = book
            .peek_matchable(Side::Buy, None)
            .unwrap()
            .orders()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_reduce_preserves_position() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Sell, 10, 5)).unwrap();
        book.insert(&limit(2, Side::Sell, 10, 5)).unwrap();

        assert_eq!(book.reduce(1, 2).unwrap(), 3);
        let orders: Vec<_> = book.peek_matchable(Side::Buy, None).unwrap().orders().collect();
        assert_eq!(orders, vec![(1, 3), (2, 5)]);
        assert_eq!(book.best_ask().unwrap().quantity, 8);

        assert_eq!(book.reduce(1, 3).unwrap(), 0);
        assert!(!book.contains(1));
        assert!(matches!(book.reduce(2, 6), Err(BookError::Overfill { .. })));
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_matchable_respects_limit() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Sell, 101, 1)).unwrap();
        book.insert(&limit(2, Side::Sell, 103, 1)).unwrap();
        book.insert(&limit(3, Side::Buy, 99, 1)).unwrap();
        book.insert(&limit(4, Side::Buy, 97, 1)).unwrap();

        let prices: Vec<_> = book.matchable_levels(Side::Buy, Some(102)).map(|l| l.price()).collect();
        assert_eq!(prices, vec![101]);
        let prices: Vec<_> = book.matchable_levels(Side::Buy, None).map(|l| l.price()).collect();
        assert_eq!(prices, vec![101, 103]);
        let prices: Vec<_> = book.matchable_levels(Side::Sell, Some(98)).map(|l| l.price()).collect();
        assert_eq!(prices, vec![99]);
        assert!(book.peek_matchable(Side::Sell, Some(100)).is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_market_orders() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Buy, 10, 1)).unwrap();
        assert_eq!(
            book.insert(&limit(1, Side::Buy, 10, 1)),
            Err(BookError::DuplicateOrder(1))
        );

        let request = NewOrderRequest::market(1, "BTC/USD", Side::Buy, 1);
        let market = Order::accept(2, 2, Arc::from("BTC/USD"), &request, 0);
        assert!(matches!(book.insert(&market), Err(BookError::NotRestable { .. })));
    }

    #[test]
    fn test_insert_refuses_side_overflow() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Buy, 10, u64::MAX)).unwrap();
        assert!(!book.can_rest(Side::Buy, 1));
        assert!(book.can_rest(Side::Sell, u64::MAX));

        // 同价位与不同价位都不能让总量溢出
        assert_eq!(
            book.insert(&limit(2, Side::Buy, 10, 2)),
            Err(BookError::QuantityOverflow { order_id: 2, side: Side::Buy })
        );
        assert!(book.insert(&limit(3, Side::Buy, 9, 1)).is_err());
        assert!(!book.contains(2));
        assert_eq!(book.best_bid().unwrap().order_count, 1);
        book.check_integrity().unwrap();

        book.reduce(1, 5).unwrap();
        assert!(book.can_rest(Side::Buy, 5));
        book.insert(&limit(2, Side::Buy, 10, 5)).unwrap();
        assert_eq!(book.side_quantity(Side::Buy), u64::MAX);
        book.check_integrity().unwrap();
    }

    #[test]
    fn test_snapshot_and_depth() {
        let mut book = OrderBook::new();
        book.insert(&limit(1, Side::Buy, 10, 1)).unwrap();
        book.insert(&limit(2, Side::Buy, 11, 2)).unwrap();
        book.insert(&limit(3, Side::Buy, 11, 3)).unwrap();
        book.insert(&limit(4, Side::Sell, 12, 4)).unwrap();

        let snapshot = book.snapshot();
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].price, 11);
        assert_eq!(snapshot.bids[0].orders, vec![(2, 2), (3, 3)]);
        assert_eq!(snapshot.asks[0].total_quantity, 4);

        let depth = book.depth(1);
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].quantity, 5);
    }
}
