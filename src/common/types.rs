//! Unified types shared by every component
//!
//! Planner, normalizer, order builder, orchestrator and broker clients all speak
//! this one vocabulary; exchange-specific wire mapping stays inside each client.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::TradingError;

/// Directional stance of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// The side that reduces a position held on this side
    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// +1 for long, -1 for short
    pub fn sign(self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Side {
    type Err = TradingError;

    /// Accepts English and Spanish variants, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "largo" | "buy" | "compra" | "comprar" => Ok(Side::Long),
            "short" | "corto" | "sell" | "venta" | "vender" => Ok(Side::Short),
            other => Err(TradingError::InvalidInput(format!(
                "invalid side: {} (use 'long' or 'short')",
                other
            ))),
        }
    }
}

/// Order kinds understood by every broker connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Limit,
    Market,
    Stop,
    TakeProfit,
    TrailingStop,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Stop => write!(f, "STOP"),
            OrderKind::TakeProfit => write!(f, "TAKE_PROFIT"),
            OrderKind::TrailingStop => write!(f, "TRAILING_STOP"),
        }
    }
}

/// How an opening order enters the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    #[default]
    Limit,
    Market,
}

impl From<EntryKind> for OrderKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Limit => OrderKind::Limit,
            EntryKind::Market => OrderKind::Market,
        }
    }
}

/// Price source used to evaluate conditional triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingType {
    MarkPrice,
    ContractPrice,
}

/// Stop-loss leg attached to an entry order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossConfig {
    pub trigger_price: Decimal,
    /// Zero means execute as market on trigger
    pub order_price: Decimal,
    pub working_type: WorkingType,
}

/// Take-profit leg attached to an entry order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitConfig {
    pub trigger_price: Decimal,
    pub order_price: Decimal,
    pub working_type: WorkingType,
}

/// Trailing stop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub activation_price: Decimal,
    /// Fraction, e.g. 0.005 for 0.5%
    pub callback_rate: Decimal,
}

/// Broker-agnostic order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub size: Decimal,
    /// Limit price; `None` for market and stop-market orders
    pub price: Option<Decimal>,
    /// Trigger price for stop / take-profit orders
    pub stop_price: Option<Decimal>,
    pub stop_loss: Option<StopLossConfig>,
    pub take_profit: Option<TakeProfitConfig>,
    pub trailing: Option<TrailingConfig>,
    pub reduce_only: bool,
}

/// Acknowledgement returned after an order is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}

/// Futures account balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub total: Decimal,
    pub available: Decimal,
    pub in_use: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Open position on an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    /// Always positive; direction is carried by `side`
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
}

/// Resting order on an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub size: Decimal,
    pub price: Decimal,
    pub stop_price: Decimal,
    #[serde(default)]
    pub reduce_only: bool,
}

impl Order {
    /// Price the order acts at: limit price, falling back to the trigger
    pub fn effective_price(&self) -> Decimal {
        if self.price.is_zero() {
            self.stop_price
        } else {
            self.price
        }
    }
}

/// Position query filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionFilter {
    pub symbol: Option<String>,
}

impl PositionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
        }
    }
}

/// Order query filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub symbol: Option<String>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
        }
    }
}

impl From<Option<String>> for PositionFilter {
    fn from(symbol: Option<String>) -> Self {
        Self { symbol }
    }
}

impl From<Option<String>> for OrderFilter {
    fn from(symbol: Option<String>) -> Self {
        Self { symbol }
    }
}
