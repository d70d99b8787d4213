use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::common::errors::{Result, TradingError};
use crate::config::types::{LeveragePolicy, TakeProfitLevel};
use crate::strategy::calculator::RiskCalculator;
use crate::strategy::traits::PlanningStrategy;
use crate::strategy::types::{PositionParams, PositionPlan, StopLossLeg, TakeProfitLeg};

/// Fixed risk/reward planning
///
/// Size comes from the risk budget and stop distance. Targets are resolved in
/// this order:
/// 1. an explicit take profit on the command (single target),
/// 2. a risk/reward ratio on the command (single target),
/// 3. configured scale-out levels, nearest first,
/// 4. the default ratio (single target).
#[derive(Debug, Clone)]
pub struct RiskRatioStrategy {
    default_rr_ratio: Decimal,
    levels: Vec<TakeProfitLevel>,
}

impl RiskRatioStrategy {
    pub fn new(default_rr_ratio: Decimal) -> Self {
        Self {
            default_rr_ratio,
            levels: Vec::new(),
        }
    }

    /// Scale out over several targets instead of one
    pub fn with_levels(mut self, levels: Vec<TakeProfitLevel>) -> Self {
        self.levels = levels;
        self.levels.sort_by(|a, b| a.rr_ratio.cmp(&b.rr_ratio));
        self
    }

    fn take_profits(&self, params: &PositionParams) -> Result<Vec<TakeProfitLeg>> {
        if let Some(tp) = params.take_profit {
            if !RiskCalculator::take_profit_in_profit(params.side, params.entry_price, tp) {
                return Err(TradingError::InvalidInput(format!(
                    "take profit {} is not in profit for a {} entry at {}",
                    tp, params.side, params.entry_price
                )));
            }
            return Ok(vec![TakeProfitLeg {
                price: tp,
                fraction: Decimal::ONE,
            }]);
        }

        if let Some(rr) = params.rr_ratio {
            return Ok(vec![self.leg(params, rr, Decimal::ONE)?]);
        }

        if !self.levels.is_empty() {
            return self
                .levels
                .iter()
                .map(|level| self.leg(params, level.rr_ratio, level.fraction))
                .collect();
        }

        Ok(vec![self.leg(params, self.default_rr_ratio, Decimal::ONE)?])
    }

    fn leg(&self, params: &PositionParams, rr: Decimal, fraction: Decimal) -> Result<TakeProfitLeg> {
        let price = RiskCalculator::calculate_rr_take_profit(
            params.side,
            params.entry_price,
            params.stop_loss,
            rr,
        )?;
        Ok(TakeProfitLeg { price, fraction })
    }
}

impl Default for RiskRatioStrategy {
    fn default() -> Self {
        Self::new(rust_decimal_macros::dec!(2))
    }
}

impl PlanningStrategy for RiskRatioStrategy {
    fn name(&self) -> &str {
        "riskratio"
    }

    fn calculate_position(&self, params: &PositionParams) -> Result<PositionPlan> {
        RiskCalculator::validate_price_logic(params.side, params.entry_price, params.stop_loss)?;

        let size = RiskCalculator::calculate_size(
            params.account_balance,
            params.risk_percent,
            params.entry_price,
            params.stop_loss,
        )?;

        let leverage = RiskCalculator::calculate_leverage(
            size,
            params.entry_price,
            params.account_balance,
            params.max_leverage,
        )?;

        if leverage.exceeds_max {
            match params.leverage_policy {
                LeveragePolicy::Abort => {
                    return Err(TradingError::LeverageExceedsMax {
                        required: leverage.required,
                        max: leverage.leverage,
                    });
                }
                LeveragePolicy::Clamp => {
                    warn!(
                        symbol = %params.symbol,
                        required = leverage.required,
                        max = leverage.leverage,
                        "Required leverage exceeds maximum, clamping"
                    );
                }
            }
        }

        let take_profits = self.take_profits(params)?;

        debug!(
            symbol = %params.symbol,
            side = %params.side,
            %size,
            leverage = leverage.leverage,
            targets = take_profits.len(),
            "Position planned"
        );

        Ok(PositionPlan {
            symbol: params.symbol.clone(),
            side: params.side,
            size,
            entry_price: params.entry_price,
            leverage: leverage.leverage,
            required_leverage: leverage.required,
            risk_amount: RiskCalculator::risk_amount(params.account_balance, params.risk_percent),
            risk_percent: params.risk_percent,
            notional_value: size * params.entry_price,
            stop_loss: Some(StopLossLeg {
                price: params.stop_loss,
            }),
            take_profits,
            entry_kind: params.entry_kind,
        })
    }
}
