use serde::{Deserialize, Serialize};

use crate::shared::protocol::{OrderId, Sequence, Side, TradeId};
use crate::shared::timestamp::Timestamp;

/// 成交记录
///
/// `price` is always the maker's (resting order's) price; the taker gets any
/// price improvement. `sequence_number` increases strictly per symbol across
/// acceptances and trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: String,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_account_id: u64,
    pub taker_account_id: u64,
    /// Side of the incoming (taker) order
    pub taker_side: Side,
    pub price: u64,
    pub quantity: u64,
    pub timestamp: Timestamp,
    pub sequence_number: Sequence,
}

impl Trade {
    #[inline]
    pub fn buy_order_id(&self) -> OrderId {
        match self.taker_side {
            Side::Buy => self.taker_order_id,
            Side::Sell => self.maker_order_id,
        }
    }

    #[inline]
    pub fn sell_order_id(&self) -> OrderId {
        match self.taker_side {
            Side::Buy => self.maker_order_id,
            Side::Sell => self.taker_order_id,
        }
    }
}
