//! Trait definitions for exchange connections

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::errors::{Result, TradingError};
use super::types::{
    Balance, Order, OrderAck, OrderFilter, OrderRequest, Position, PositionFilter, Side,
};

/// Capability contract for an exchange account connection
///
/// One instance belongs to exactly one account for the whole process.
/// Implementations own their transport concerns (signing, timeouts, retries);
/// callers treat every error the same way regardless of its cause.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Exchange identifier, used in logs
    fn broker_name(&self) -> &'static str;

    /// Fetch the futures wallet balance
    async fn get_balance(&self) -> Result<Balance>;

    /// Latest traded price for a symbol
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal>;

    /// All open positions matching the filter
    async fn get_positions(&self, filter: &PositionFilter) -> Result<Vec<Position>>;

    /// The open position for a symbol, if any
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>>;

    /// All resting orders matching the filter
    async fn get_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// Set leverage for one side of a symbol
    async fn set_leverage(&self, symbol: &str, side: Side, leverage: u32) -> Result<()>;

    /// Submit an order
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck>;

    /// Cancel every resting order on a symbol
    async fn cancel_all_orders(&self, symbol: &str) -> Result<()>;
}

/// Boxed connection for dynamic dispatch
pub type BoxedBroker = Box<dyn BrokerConnection>;

/// Pick the one open position on `symbol` out of a position list
///
/// Fails with `AmbiguousPosition` when a hedge-mode account holds both sides.
pub fn single_position(symbol: &str, positions: Vec<Position>) -> Result<Option<Position>> {
    let mut matching = positions.into_iter().filter(|p| p.symbol == symbol);
    let first = matching.next();
    if matching.any(|p| Some(p.side) != first.as_ref().map(|f| f.side)) {
        return Err(TradingError::AmbiguousPosition(symbol.to_string()));
    }
    Ok(first)
}
