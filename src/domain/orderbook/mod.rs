/// Domain Layer - OrderBook Module
///
/// Price-time priority book for a single instrument: two `BTreeMap`s of
/// price levels (bids best = highest, asks best = lowest) over an arena of
/// linked order nodes with an `order_id` index for O(1) lookup on cancel.

pub mod book;
pub mod price_level;
pub mod traits;

pub use book::{BookError, BookSnapshot, Depth, LevelSnapshot, OrderBook, RemovedOrder};
pub use price_level::{LevelSummary, LevelView, PriceLevel};
pub use traits::MarketView;
