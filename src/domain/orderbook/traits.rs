/// MarketView Trait - top-of-book queries
///
/// Implemented by the order book and by anything that wraps one. Only the two
/// best prices are required; spread and midpoint have default
/// implementations.
pub trait MarketView {
    /// Highest resting bid price, `None` when the bid side is empty
    fn best_bid_price(&self) -> Option<u64>;

    /// Lowest resting ask price, `None` when the ask side is empty
    fn best_ask_price(&self) -> Option<u64>;

    /// `best_ask - best_bid`, `None` if either side is empty.
    ///
    /// A persisted book is never crossed, so the spread is always positive
    /// when both sides exist.
    fn spread(&self) -> Option<u64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint price ((best_bid + best_ask) / 2), rounded down
    fn mid_price(&self) -> Option<u64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(bid / 2 + ask / 2 + (bid % 2 + ask % 2) / 2),
            _ => None,
        }
    }
}
