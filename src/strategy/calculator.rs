use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::errors::{Result, TradingError};
use crate::common::types::Side;
use crate::strategy::types::LeverageCalc;

/// Position math
///
/// Pure functions over plain numbers: no network, no clock, no state.
/// Strategies and the presentation layer both build on these.
pub struct RiskCalculator;

impl RiskCalculator {
    /// Amount of quote currency lost if the stop is hit
    ///
    /// `balance × risk_percent / 100`
    pub fn risk_amount(balance: Decimal, risk_percent: Decimal) -> Decimal {
        balance * risk_percent / dec!(100)
    }

    /// Position size that loses exactly the risk amount at the stop
    ///
    /// `size = (balance × risk_percent / 100) / |entry − stop_loss|`
    ///
    /// # Errors
    /// `InvalidInput` when entry equals stop loss or when balance, risk
    /// percent or entry is not positive.
    pub fn calculate_size(
        balance: Decimal,
        risk_percent: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
    ) -> Result<Decimal> {
        if balance <= Decimal::ZERO {
            return Err(TradingError::InvalidInput(format!(
                "balance must be positive, got {}",
                balance
            )));
        }
        if risk_percent <= Decimal::ZERO {
            return Err(TradingError::InvalidInput(format!(
                "risk percent must be positive, got {}",
                risk_percent
            )));
        }
        if entry <= Decimal::ZERO {
            return Err(TradingError::InvalidInput(format!(
                "entry price must be positive, got {}",
                entry
            )));
        }

        let distance = (entry - stop_loss).abs();
        if distance.is_zero() {
            return Err(TradingError::InvalidInput(
                "entry price and stop loss cannot be equal".to_string(),
            ));
        }

        Ok(Self::risk_amount(balance, risk_percent) / distance)
    }

    /// Leverage needed to carry `size` at `entry` with `balance` as margin
    ///
    /// `required = ceil(size × entry / balance)`, then clamped to `[1, max_leverage]`.
    /// Exceeding the cap is reported through `exceeds_max`, not as an error.
    pub fn calculate_leverage(
        size: Decimal,
        entry: Decimal,
        balance: Decimal,
        max_leverage: u32,
    ) -> Result<LeverageCalc> {
        if balance <= Decimal::ZERO {
            return Err(TradingError::InvalidInput(format!(
                "balance must be positive, got {}",
                balance
            )));
        }

        let max_leverage = max_leverage.max(1);
        let notional = size * entry;
        let required = (notional / balance).ceil().to_u32().unwrap_or(u32::MAX).max(1);

        Ok(LeverageCalc {
            leverage: required.min(max_leverage),
            required,
            exceeds_max: required > max_leverage,
        })
    }

    /// Take profit placed `rr_ratio` risk distances away from entry, in the profitable direction
    pub fn calculate_rr_take_profit(
        side: Side,
        entry: Decimal,
        stop_loss: Decimal,
        rr_ratio: Decimal,
    ) -> Result<Decimal> {
        if rr_ratio <= Decimal::ZERO {
            return Err(TradingError::InvalidInput(format!(
                "risk/reward ratio must be positive, got {}",
                rr_ratio
            )));
        }

        let distance = (entry - stop_loss).abs();
        Ok(entry + side.sign() * rr_ratio * distance)
    }

    /// Unrealized PnL in percent of entry, positive when the position is in profit
    pub fn calculate_pnl_percent(side: Side, entry: Decimal, mark_price: Decimal) -> Decimal {
        if entry.is_zero() {
            return Decimal::ZERO;
        }
        side.sign() * (mark_price - entry) / entry * dec!(100)
    }

    /// Signed percent distance from mark to target
    ///
    /// Positive means the target lies in the position's favorable direction,
    /// so a take profit reads positive and a stop loss negative.
    pub fn calculate_distance_to_price(side: Side, mark_price: Decimal, target: Decimal) -> Decimal {
        Self::calculate_pnl_percent(side, mark_price, target)
    }

    /// PnL realized if `size` fills at `execution_price`: `(nominal, percent)`
    pub fn calculate_expected_pnl(
        side: Side,
        entry: Decimal,
        execution_price: Decimal,
        size: Decimal,
    ) -> (Decimal, Decimal) {
        let nominal = side.sign() * (execution_price - entry) * size;
        let percent = Self::calculate_pnl_percent(side, entry, execution_price);
        (nominal, percent)
    }

    /// Static check that the stop sits on the losing side of entry
    ///
    /// LONG needs `stop_loss < entry`, SHORT needs `stop_loss > entry`.
    pub fn validate_price_logic(side: Side, entry: Decimal, stop_loss: Decimal) -> Result<()> {
        let ok = match side {
            Side::Long => stop_loss < entry,
            Side::Short => stop_loss > entry,
        };

        if ok {
            Ok(())
        } else {
            Err(TradingError::StopLossPlacement { side })
        }
    }

    /// Whether a take profit sits on the profitable side of entry
    pub fn take_profit_in_profit(side: Side, entry: Decimal, take_profit: Decimal) -> bool {
        match side {
            Side::Long => take_profit > entry,
            Side::Short => take_profit < entry,
        }
    }
}
