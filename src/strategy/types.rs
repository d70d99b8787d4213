use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{EntryKind, Side};
use crate::config::types::LeveragePolicy;

/// Inputs a planning strategy needs to size one position
///
/// Everything here is already validated by the normalizer; live values
/// (`account_balance`) come from the account being planned for.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionParams {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    /// Explicit target; wins over any ratio
    pub take_profit: Option<Decimal>,
    /// Per-command risk/reward ratio
    pub rr_ratio: Option<Decimal>,
    /// Available margin in quote currency
    pub account_balance: Decimal,
    /// Percent of `account_balance` put at risk (0 < r <= 100)
    pub risk_percent: Decimal,
    pub max_leverage: u32,
    pub leverage_policy: LeveragePolicy,
    pub entry_kind: EntryKind,
}

/// Stop-loss leg of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossLeg {
    pub price: Decimal,
}

/// One take-profit target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitLeg {
    pub price: Decimal,
    /// Share of the position closed at this target
    pub fraction: Decimal,
}

/// Fully computed position, ready to be turned into orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPlan {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    /// Leverage that will be set on the exchange
    pub leverage: u32,
    /// Leverage the position actually needs before clamping
    pub required_leverage: u32,
    pub risk_amount: Decimal,
    pub risk_percent: Decimal,
    pub notional_value: Decimal,
    pub stop_loss: Option<StopLossLeg>,
    /// Ordered nearest target first
    pub take_profits: Vec<TakeProfitLeg>,
    pub entry_kind: EntryKind,
}

impl PositionPlan {
    /// Whether the configured cap reduced the leverage
    pub fn leverage_clamped(&self) -> bool {
        self.required_leverage > self.leverage
    }

    /// Margin that must be available to post the position
    pub fn required_margin(&self) -> Decimal {
        if self.leverage == 0 {
            return self.notional_value;
        }
        self.notional_value / Decimal::from(self.leverage)
    }
}

/// Result of a leverage computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverageCalc {
    /// Leverage clamped to `[1, max]`
    pub leverage: u32,
    /// `ceil(notional / balance)` before clamping
    pub required: u32,
    /// `required` was above the cap; the caller decides whether to clamp or abort
    pub exceeds_max: bool,
}
