/// Price-time priority match planner
///
/// Walks the opposing side of the book from the best eligible level outward
/// and, inside each level, from the earliest resting order onward. Nothing
/// is mutated: the result is a list of fills the engine turns into events,
/// logs, and only then applies. Walking a read-only book gives the same
/// fills as consuming it step by step, because a fully filled maker is
/// simply skipped past and a partially filled maker ends the walk.
use smallvec::SmallVec;

use crate::domain::orderbook::OrderBook;
use crate::shared::protocol::{OrderId, OrderType, Side};

/// One planned execution against a resting order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub maker_order_id: OrderId,
    /// Maker's price, which is the execution price
    pub price: u64,
    pub quantity: u64,
    /// Maker's open quantity before this fill
    pub maker_open: u64,
}

impl Fill {
    #[inline]
    pub fn exhausts_maker(&self) -> bool {
        self.quantity == self.maker_open
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPlan {
    pub fills: SmallVec<[Fill; 8]>,
    /// Taker quantity left after all fills
    pub remaining: u64,
}

impl MatchPlan {
    pub fn filled_quantity(&self) -> u64 {
        self.fills.iter().map(|f| f.quantity).sum()
    }
}

/// Plans the fills for an incoming order.
///
/// `limit` is the taker's price for limit orders, ignored for market orders.
pub fn plan_match(
    book: &OrderBook,
    taker_side: Side,
    order_type: OrderType,
    limit: u64,
    quantity: u64,
) -> MatchPlan {
    let limit = match order_type {
        OrderType::Limit => Some(limit),
        OrderType::Market => None,
    };

    let mut plan = MatchPlan {
        fills: SmallVec::new(),
        remaining: quantity,
    };

    'levels: for level in book.matchable_levels(taker_side, limit) {
        for (maker_order_id, maker_open) in level.orders() {
            if plan.remaining == 0 {
                break 'levels;
            }
            let fill = plan.remaining.min(maker_open);
            plan.fills.push(Fill {
                maker_order_id,
                price: level.price(),
                quantity: fill,
                maker_open,
            });
            plan.remaining -= fill;
        }
        if plan.remaining == 0 {
            break;
        }
    }

    plan
}
