use rust_decimal::Decimal;

use crate::common::errors::{Result, TradingError};
use crate::common::types::{EntryKind, Side};
use crate::intent::{IntentKind, NormalizedCommand};

/// Which accounts an operation runs on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccountScope {
    /// Every enabled account, in configuration order
    #[default]
    All,
    /// One enabled account by name
    Named(String),
}

impl From<Option<String>> for AccountScope {
    fn from(name: Option<String>) -> Self {
        match name {
            Some(name) => AccountScope::Named(name),
            None => AccountScope::All,
        }
    }
}

/// Fully specified request to open a position
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    pub risk_percent: Decimal,
    pub rr_ratio: Option<Decimal>,
    pub entry_kind: EntryKind,
}

/// One user-level operation, fanned out across accounts
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Open(OpenRequest),
    Close {
        symbol: Option<String>,
        /// `None`, 0 or 100 close the whole position
        percentage: Option<Decimal>,
    },
    ViewPositions {
        symbol: Option<String>,
    },
    ViewOrders {
        symbol: Option<String>,
    },
    Cancel {
        symbol: Option<String>,
    },
    TrailingStop {
        symbol: String,
        activation_price: Decimal,
        /// Percent, e.g. 0.5 for 0.5%
        callback_rate: Decimal,
    },
    BreakEven {
        symbol: String,
    },
    Balance,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open(_) => "open",
            Operation::Close { .. } => "close",
            Operation::ViewPositions { .. } => "positions",
            Operation::ViewOrders { .. } => "orders",
            Operation::Cancel { .. } => "cancel",
            Operation::TrailingStop { .. } => "trail",
            Operation::BreakEven { .. } => "breakeven",
            Operation::Balance => "balance",
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| TradingError::Validation(vec![format!("missing required field: {}", field)]))
}

impl TryFrom<&NormalizedCommand> for Operation {
    type Error = TradingError;

    /// Only valid commands convert; invalid ones yield their problems as a `Validation` error
    fn try_from(cmd: &NormalizedCommand) -> Result<Self> {
        cmd.ensure_valid()?;

        let symbol = cmd.symbol().map(str::to_string);

        let op = match cmd.intent() {
            IntentKind::Open => Operation::Open(OpenRequest {
                symbol: required(symbol, "symbol")?,
                side: required(cmd.side(), "side")?,
                entry_price: required(cmd.entry_price(), "entry_price")?,
                stop_loss: required(cmd.stop_loss(), "stop_loss")?,
                take_profit: cmd.take_profit(),
                risk_percent: required(cmd.risk_percent(), "risk_percent")?,
                rr_ratio: cmd.rr_ratio(),
                entry_kind: cmd.entry_kind(),
            }),
            IntentKind::Close => Operation::Close {
                symbol,
                percentage: cmd.close_percentage(),
            },
            IntentKind::ViewPositions => Operation::ViewPositions { symbol },
            IntentKind::ViewOrders => Operation::ViewOrders { symbol },
            IntentKind::Cancel => Operation::Cancel { symbol },
            IntentKind::TrailingStop => Operation::TrailingStop {
                symbol: required(symbol, "symbol")?,
                activation_price: required(cmd.trigger_price(), "trigger_price")?,
                callback_rate: required(cmd.callback_rate(), "callback_rate")?,
            },
            IntentKind::BreakEven => Operation::BreakEven {
                symbol: required(symbol, "symbol")?,
            },
            IntentKind::CheckBalance => Operation::Balance,
        };

        Ok(op)
    }
}
