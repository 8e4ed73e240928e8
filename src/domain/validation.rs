/// 订单校验
///
/// A request that fails here never gets an order id, never touches the book
/// and leaves nothing in the event log. Rules are checked in a fixed order
/// and the first failure is reported:
///
/// 1. symbol present (and allow-listed when a list is configured)
/// 2. quantity positive and within `[min_quantity, max_quantity]`
/// 3. LIMIT only: price positive and within `[min_price, max_price]`
///
/// Side and order type are closed enums by the time a request gets here;
/// their string forms fail while parsing with `InvalidSide` / `InvalidType`.
///
/// ```rust
/// use price_time_engine::domain::validation::OrderValidator;
/// use price_time_engine::shared::protocol::{NewOrderRequest, Side};
///
/// let validator = OrderValidator::new();
/// let request = NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 5000, 10);
/// assert!(validator.validate(&request).is_ok());
/// ```

use crate::shared::protocol::{NewOrderRequest, OrderType, Side};
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid side '{0}'")]
    InvalidSide(String),

    #[error("invalid order type '{0}'")]
    InvalidType(String),

    #[error("symbol is empty")]
    EmptySymbol,

    #[error("symbol '{0}' is not tradable here")]
    SymbolNotAllowed(String),

    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("limit price must be positive")]
    ZeroPrice,

    #[error("quantity {quantity} outside [{min}, {max}]")]
    QuantityOutOfRange { quantity: u64, min: u64, max: u64 },

    #[error("price {price} outside [{min}, {max}]")]
    PriceOutOfRange { price: u64, min: u64, max: u64 },

    /// Resting the unmatched remainder would overflow the book's aggregates
    #[error("cannot rest {quantity} more on the {side} side")]
    BookCapacityExceeded { side: Side, quantity: u64 },
}

/// Bounds applied on top of the fixed rules. Defaults accept every positive
/// value and every symbol.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub min_price: u64,
    pub max_price: u64,
    pub min_quantity: u64,
    pub max_quantity: u64,
    /// 为空表示不限制交易代码
    pub allowed_symbols: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_price: 1,
            max_price: u64::MAX,
            min_quantity: 1,
            max_quantity: u64::MAX,
            allowed_symbols: Vec::new(),
        }
    }
}

impl ValidationConfig {
    fn price_range(&self) -> RangeInclusive<u64> {
        self.min_price..=self.max_price
    }

    fn quantity_range(&self) -> RangeInclusive<u64> {
        self.min_quantity..=self.max_quantity
    }

    fn allows(&self, symbol: &str) -> bool {
        self.allowed_symbols.is_empty() || self.allowed_symbols.iter().any(|s| s == symbol)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderValidator {
    config: ValidationConfig,
}

impl OrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Checks `request`, reporting the first rule it breaks.
    pub fn validate(&self, request: &NewOrderRequest) -> Result<(), ValidationError> {
        let symbol = request.symbol.trim();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if !self.config.allows(&request.symbol) {
            return Err(ValidationError::SymbolNotAllowed(request.symbol.clone()));
        }

        let quantity = request.quantity;
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        let range = self.config.quantity_range();
        if !range.contains(&quantity) {
            return Err(ValidationError::QuantityOutOfRange {
                quantity,
                min: *range.start(),
                max: *range.end(),
            });
        }

        // 市价单不校验价格
        if request.order_type == OrderType::Market {
            return Ok(());
        }

        let price = request.price;
        if price == 0 {
            return Err(ValidationError::ZeroPrice);
        }
        let range = self.config.price_range();
        if !range.contains(&price) {
            return Err(ValidationError::PriceOutOfRange {
                price,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc_bid() -> NewOrderRequest {
        NewOrderRequest::limit(1, "BTC/USD", Side::Buy, 50_000, 10)
    }

    fn bounded(config: ValidationConfig) -> OrderValidator {
        OrderValidator::with_config(config)
    }

    #[test]
    fn test_defaults_accept_positive_limit_order() {
        assert_eq!(OrderValidator::new().validate(&btc_bid()), Ok(()));
    }

    #[test]
    fn test_zero_values_rejected() {
        let validator = OrderValidator::new();

        let mut request = btc_bid();
        request.price = 0;
        assert_eq!(validator.validate(&request), Err(ValidationError::ZeroPrice));

        request.quantity = 0;
        // 数量先于价格校验
        assert_eq!(validator.validate(&request), Err(ValidationError::ZeroQuantity));
    }

    #[test]
    fn test_market_order_skips_price_rules() {
        let validator = bounded(ValidationConfig {
            min_price: 10,
            ..ValidationConfig::default()
        });
        let request = NewOrderRequest::market(1, "BTC/USD", Side::Sell, 5);
        assert_eq!(request.price, 0);
        assert!(validator.validate(&request).is_ok());
    }

    #[test]
    fn test_blank_symbol() {
        let mut request = btc_bid();
        request.symbol = "  ".to_string();
        assert_eq!(
            OrderValidator::new().validate(&request),
            Err(ValidationError::EmptySymbol)
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let validator = bounded(ValidationConfig {
            min_price: 100,
            max_price: 100_000,
            max_quantity: 1_000,
            ..ValidationConfig::default()
        });

        let mut request = btc_bid();
        request.price = 100_000;
        request.quantity = 1_000;
        assert!(validator.validate(&request).is_ok());

        request.price = 99;
        assert_eq!(
            validator.validate(&request),
            Err(ValidationError::PriceOutOfRange {
                price: 99,
                min: 100,
                max: 100_000
            })
        );

        request.price = 500;
        request.quantity = 1_001;
        assert!(matches!(
            validator.validate(&request),
            Err(ValidationError::QuantityOutOfRange { quantity: 1_001, .. })
        ));
    }

    #[test]
    fn test_allow_list() {
        let validator = bounded(ValidationConfig {
            allowed_symbols: vec!["BTC/USD".to_string(), "ETH/USD".to_string()],
            ..ValidationConfig::default()
        });
        assert!(validator.validate(&btc_bid()).is_ok());

        let mut request = btc_bid();
        request.symbol = "XRP/USD".to_string();
        let err = validator.validate(&request).unwrap_err();
        assert_eq!(err, ValidationError::SymbolNotAllowed("XRP/USD".to_string()));
        assert_eq!(err.to_string(), "symbol 'XRP/USD' is not tradable here");
    }
}
