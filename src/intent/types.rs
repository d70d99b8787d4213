use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::errors::{Result, TradingError};
use crate::common::types::{EntryKind, Side};

/// What the user wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Open,
    Close,
    ViewPositions,
    ViewOrders,
    Cancel,
    TrailingStop,
    BreakEven,
    CheckBalance,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Open => "open_position",
            IntentKind::Close => "close_position",
            IntentKind::ViewPositions => "view_positions",
            IntentKind::ViewOrders => "view_orders",
            IntentKind::Cancel => "cancel_orders",
            IntentKind::TrailingStop => "trailing_stop",
            IntentKind::BreakEven => "break_even",
            IntentKind::CheckBalance => "check_balance",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = TradingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open_position" | "open" => Ok(IntentKind::Open),
            "close_position" | "close" => Ok(IntentKind::Close),
            "view_positions" | "positions" => Ok(IntentKind::ViewPositions),
            "view_orders" | "orders" => Ok(IntentKind::ViewOrders),
            "cancel_orders" | "cancel" => Ok(IntentKind::Cancel),
            "trailing_stop" | "trail" => Ok(IntentKind::TrailingStop),
            "break_even" | "breakeven" => Ok(IntentKind::BreakEven),
            "check_balance" | "balance" => Ok(IntentKind::CheckBalance),
            other => Err(TradingError::InvalidInput(format!("unknown intent: {}", other))),
        }
    }
}

/// Trading intent exactly as received from flags or NLP, before any checks
///
/// Side stays as free text so unrecognized words can be reported as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIntent {
    pub kind: IntentKind,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub risk_percent: Option<Decimal>,
    pub rr_ratio: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    /// Percent, e.g. 0.5 for 0.5%
    pub callback_rate: Option<Decimal>,
    pub close_percentage: Option<Decimal>,
    /// Enter at market instead of with a limit order
    pub market: bool,
}

impl RawIntent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            symbol: None,
            side: None,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            risk_percent: None,
            rr_ratio: None,
            trigger_price: None,
            callback_rate: None,
            close_percentage: None,
            market: false,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_side(mut self, side: impl Into<String>) -> Self {
        self.side = Some(side.into());
        self
    }
}

impl From<&NormalizedCommand> for RawIntent {
    fn from(cmd: &NormalizedCommand) -> Self {
        Self {
            kind: cmd.intent,
            symbol: cmd.symbol.clone(),
            side: cmd.side.map(|s| s.to_string()),
            entry_price: cmd.entry_price,
            stop_loss: cmd.stop_loss,
            take_profit: cmd.take_profit,
            risk_percent: cmd.risk_percent,
            rr_ratio: cmd.rr_ratio,
            trigger_price: cmd.trigger_price,
            callback_rate: cmd.callback_rate,
            close_percentage: cmd.close_percentage,
            market: cmd.entry_kind == EntryKind::Market,
        }
    }
}

/// A classified trading command
///
/// Only the normalizer builds these. Fields are read through accessors; a
/// corrected command is a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCommand {
    pub(crate) intent: IntentKind,
    pub(crate) symbol: Option<String>,
    pub(crate) side: Option<Side>,
    pub(crate) entry_price: Option<Decimal>,
    pub(crate) stop_loss: Option<Decimal>,
    pub(crate) take_profit: Option<Decimal>,
    pub(crate) risk_percent: Option<Decimal>,
    pub(crate) rr_ratio: Option<Decimal>,
    pub(crate) trigger_price: Option<Decimal>,
    pub(crate) callback_rate: Option<Decimal>,
    pub(crate) close_percentage: Option<Decimal>,
    pub(crate) entry_kind: EntryKind,
    pub(crate) missing: Vec<String>,
    pub(crate) errors: Vec<String>,
}

impl NormalizedCommand {
    pub fn intent(&self) -> IntentKind {
        self.intent
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.entry_price
    }

    pub fn stop_loss(&self) -> Option<Decimal> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<Decimal> {
        self.take_profit
    }

    pub fn risk_percent(&self) -> Option<Decimal> {
        self.risk_percent
    }

    pub fn rr_ratio(&self) -> Option<Decimal> {
        self.rr_ratio
    }

    pub fn trigger_price(&self) -> Option<Decimal> {
        self.trigger_price
    }

    pub fn callback_rate(&self) -> Option<Decimal> {
        self.callback_rate
    }

    pub fn close_percentage(&self) -> Option<Decimal> {
        self.close_percentage
    }

    pub fn entry_kind(&self) -> EntryKind {
        self.entry_kind
    }

    /// Names of required fields that were absent
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Semantic violations found in the fields that were present
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.errors.is_empty()
    }

    /// Every problem as a human-readable line, missing fields first
    pub fn problems(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|field| format!("missing required field: {}", field))
            .chain(self.errors.iter().cloned())
            .collect()
    }

    /// Turn the classification into a `Validation` error when invalid
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TradingError::Validation(self.problems()))
        }
    }
}

/// NLP output: a normalized command plus the parser's confidence
///
/// Confidence is informational; validity is decided by the normalizer alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub command: NormalizedCommand,
    pub confidence: f64,
}
