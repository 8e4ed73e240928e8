/// Order arena
///
/// Every order ever accepted for a symbol, terminal ones included, keyed by
/// `order_id`. Orders are appended and never removed, so an arena index is
/// stable for the lifetime of the engine. The book refers to orders by id;
/// this store holds the single authoritative copy of each lifecycle.
use std::collections::HashMap;

use crate::domain::order::Order;
use crate::shared::protocol::OrderId;

#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
    index: HashMap<OrderId, usize>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an order; returns `false` (and stores nothing) on a duplicate id.
    pub fn insert(&mut self, order: Order) -> bool {
        if self.index.contains_key(&order.order_id()) {
            return false;
        }
        self.index.insert(order.order_id(), self.orders.len());
        self.orders.push(order);
        true
    }

    #[inline]
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.index.get(&order_id).map(|&i| &self.orders[i])
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        match self.index.get(&order_id) {
            Some(&i) => Some(&mut self.orders[i]),
            None => None,
        }
    }

    #[inline]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in acceptance order
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}
