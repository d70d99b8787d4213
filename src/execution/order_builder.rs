use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::types::{
    EntryKind, OrderKind, OrderRequest, Position, StopLossConfig, TakeProfitConfig,
    TrailingConfig, WorkingType,
};
use crate::strategy::PositionPlan;

/// Shapes plans and positions into broker-agnostic order requests
///
/// Every function is deterministic. Orders that act on an existing position
/// are reduce-only and use the side opposite the position.
pub struct OrderBuilder;

impl OrderBuilder {
    /// Entry order with the stop loss and the first take profit attached
    pub fn build_entry_order(plan: &PositionPlan) -> OrderRequest {
        let price = match plan.entry_kind {
            EntryKind::Limit => Some(plan.entry_price),
            EntryKind::Market => None,
        };

        let stop_loss = plan.stop_loss.as_ref().map(|sl| StopLossConfig {
            trigger_price: sl.price,
            order_price: Decimal::ZERO,
            working_type: WorkingType::MarkPrice,
        });

        let take_profit = plan.take_profits.first().map(|tp| TakeProfitConfig {
            trigger_price: tp.price,
            order_price: tp.price,
            working_type: WorkingType::MarkPrice,
        });

        OrderRequest {
            symbol: plan.symbol.clone(),
            side: plan.side,
            kind: plan.entry_kind.into(),
            size: plan.size,
            price,
            stop_price: None,
            stop_loss,
            take_profit,
            trailing: None,
            reduce_only: false,
        }
    }

    /// Independent take-profit orders for every target after the first
    pub fn build_scale_out_orders(plan: &PositionPlan) -> Vec<OrderRequest> {
        plan.take_profits
            .iter()
            .skip(1)
            .map(|leg| OrderRequest {
                symbol: plan.symbol.clone(),
                side: plan.side.opposite(),
                kind: OrderKind::TakeProfit,
                size: plan.size * leg.fraction,
                price: Some(leg.price),
                stop_price: Some(leg.price),
                stop_loss: None,
                take_profit: None,
                trailing: None,
                reduce_only: true,
            })
            .collect()
    }

    /// Market order closing `percentage` of a position
    pub fn build_close_order(position: &Position, percentage: Option<Decimal>) -> OrderRequest {
        Self::reducing(position, OrderKind::Market, close_size(position.size, percentage))
    }

    /// Trailing stop over the whole position
    ///
    /// `callback_percent` is a percentage (0.5 = 0.5%); the request carries it as a fraction.
    pub fn build_trailing_stop_order(
        position: &Position,
        activation_price: Decimal,
        callback_percent: Decimal,
    ) -> OrderRequest {
        OrderRequest {
            trailing: Some(TrailingConfig {
                activation_price,
                callback_rate: callback_percent / dec!(100),
            }),
            ..Self::reducing(position, OrderKind::TrailingStop, position.size)
        }
    }

    /// Stop at the entry price over the whole position
    pub fn build_break_even_order(position: &Position) -> OrderRequest {
        OrderRequest {
            stop_price: Some(position.entry_price),
            ..Self::reducing(position, OrderKind::Stop, position.size)
        }
    }

    fn reducing(position: &Position, kind: OrderKind, size: Decimal) -> OrderRequest {
        OrderRequest {
            symbol: position.symbol.clone(),
            side: position.side.opposite(),
            kind,
            size,
            price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            trailing: None,
            reduce_only: true,
        }
    }
}

/// Size to close for a percentage; `None`, 0 and anything ≥ 100 mean everything
pub fn close_size(size: Decimal, percentage: Option<Decimal>) -> Decimal {
    match percentage {
        Some(p) if p > Decimal::ZERO && p < dec!(100) => size * p / dec!(100),
        _ => size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use crate::strategy::{StopLossLeg, TakeProfitLeg};
    use pretty_assertions::assert_eq;

    fn plan() -> PositionPlan {
        PositionPlan {
            symbol: "ETH-USDT".to_string(),
            side: Side::Long,
            size: dec!(0.4),
            entry_price: dec!(3950),
            leverage: 2,
            required_leverage: 2,
            risk_amount: dec!(20),
            risk_percent: dec!(2),
            notional_value: dec!(1580),
            stop_loss: Some(StopLossLeg { price: dec!(3900) }),
            take_profits: vec![
                TakeProfitLeg {
                    price: dec!(4000),
                    fraction: dec!(0.5),
                },
                TakeProfitLeg {
                    price: dec!(4050),
                    fraction: dec!(0.25),
                },
            ],
            entry_kind: EntryKind::Limit,
        }
    }

    fn position() -> Position {
        Position {
            symbol: "ETH-USDT".to_string(),
            side: Side::Long,
            size: dec!(0.2),
            entry_price: dec!(3950),
            mark_price: dec!(4000),
            unrealized_pnl: dec!(10),
            leverage: 5,
        }
    }

    #[test]
    fn test_entry_order_attaches_legs() {
        let req = OrderBuilder::build_entry_order(&plan());

        assert_eq!(req.kind, OrderKind::Limit);
        assert_eq!(req.price, Some(dec!(3950)));
        assert!(!req.reduce_only);
        assert_eq!(
            req.stop_loss,
            Some(StopLossConfig {
                trigger_price: dec!(3900),
                order_price: dec!(0),
                working_type: WorkingType::MarkPrice,
            })
        );
        assert_eq!(
            req.take_profit,
            Some(TakeProfitConfig {
                trigger_price: dec!(4000),
                order_price: dec!(4000),
                working_type: WorkingType::MarkPrice,
            })
        );
    }

    #[test]
    fn test_market_entry_has_no_price() {
        let mut p = plan();
        p.entry_kind = EntryKind::Market;

        let req = OrderBuilder::build_entry_order(&p);
        assert_eq!(req.kind, OrderKind::Market);
        assert_eq!(req.price, None);
    }

    #[test]
    fn test_scale_out_skips_primary_leg() {
        let orders = OrderBuilder::build_scale_out_orders(&plan());

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Short);
        assert_eq!(orders[0].kind, OrderKind::TakeProfit);
        assert_eq!(orders[0].size, dec!(0.1));
        assert_eq!(orders[0].stop_price, Some(dec!(4050)));
        assert!(orders[0].reduce_only);
    }

    #[test]
    fn test_half_close() {
        let req = OrderBuilder::build_close_order(&position(), Some(dec!(50)));

        assert_eq!(req.size, dec!(0.1));
        assert_eq!(req.side, Side::Short);
        assert_eq!(req.kind, OrderKind::Market);
        assert!(req.reduce_only);
    }

    #[test]
    fn test_close_size_full_cases() {
        for pct in [None, Some(dec!(0)), Some(dec!(100))] {
            assert_eq!(close_size(dec!(0.2), pct), dec!(0.2));
        }
        assert_eq!(close_size(dec!(0.2), Some(dec!(25))), dec!(0.05));
    }

    #[test]
    fn test_trailing_stop_rate_is_fraction() {
        let req = OrderBuilder::build_trailing_stop_order(&position(), dec!(4200), dec!(0.5));

        assert_eq!(req.kind, OrderKind::TrailingStop);
        assert_eq!(req.size, dec!(0.2));
        assert_eq!(
            req.trailing,
            Some(TrailingConfig {
                activation_price: dec!(4200),
                callback_rate: dec!(0.005),
            })
        );
    }

    #[test]
    fn test_break_even_stop_at_entry() {
        let mut pos = position();
        pos.side = Side::Short;

        let req = OrderBuilder::build_break_even_order(&pos);
        assert_eq!(req.kind, OrderKind::Stop);
        assert_eq!(req.side, Side::Long);
        assert_eq!(req.stop_price, Some(dec!(3950)));
        assert!(req.reduce_only);
    }
}
