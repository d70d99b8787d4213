//! Text rendering for reports and account views
//!
//! Everything here returns a `String`; printing is left to the binary.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tabled::{settings::Style, Table, Tabled};

use crate::common::types::{Balance, EntryKind, Order, OrderKind, Position};
use crate::execution::{AccountResult, AccountSnapshot, ActionStatus, BatchReport, Outcome};
use crate::strategy::{PositionPlan, RiskCalculator};

/// Order ids longer than this are shortened unless verbose
const SHORT_ID_LEN: usize = 10;

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Mark")]
    mark: String,
    #[tabled(rename = "PnL")]
    pnl: String,
    #[tabled(rename = "PnL %")]
    pnl_percent: String,
    #[tabled(rename = "To TP")]
    to_tp: String,
    #[tabled(rename = "To SL")]
    to_sl: String,
    #[tabled(rename = "Leverage")]
    leverage: String,
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Expected PnL")]
    expected_pnl: String,
}

fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn field(name: &str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: name.to_string(),
        value: value.into(),
    }
}

fn money(value: Decimal) -> String {
    let value = value.round_dp(2);
    if value.is_sign_negative() && !value.is_zero() {
        format!("-${:.2}", value.abs())
    } else {
        format!("${:.2}", value)
    }
}

fn signed_money(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{}", money(value))
    } else {
        money(value)
    }
}

fn signed_percent(value: Decimal) -> String {
    let value = value.round_dp(2);
    if value > Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

fn size(value: Decimal) -> String {
    format!("{:.4}", value)
}

// ============================================================================
// Views
// ============================================================================

pub fn render_balance(balance: &Balance) -> String {
    table(vec![
        field("Asset", balance.asset.clone()),
        field("Total", money(balance.total)),
        field("Available", money(balance.available)),
        field("In Use", money(balance.in_use)),
        field("Unrealized PnL", signed_money(balance.unrealized_pnl)),
    ])
}

pub fn render_plan(plan: &PositionPlan) -> String {
    let mut rows = vec![
        field("Symbol", plan.symbol.clone()),
        field("Side", plan.side.to_string()),
        field(
            "Entry",
            match plan.entry_kind {
                EntryKind::Limit => plan.entry_price.to_string(),
                EntryKind::Market => format!("{} (market)", plan.entry_price),
            },
        ),
        field("Size", size(plan.size)),
    ];
    if let Some(sl) = &plan.stop_loss {
        rows.push(field("Stop Loss", sl.price.to_string()));
    }
    for (i, tp) in plan.take_profits.iter().enumerate() {
        let name = if plan.take_profits.len() == 1 {
            "Take Profit".to_string()
        } else {
            format!("Take Profit {}", i + 1)
        };
        rows.push(FieldRow {
            field: name,
            value: format!("{:.2} ({}%)", tp.price, (tp.fraction * dec!(100)).normalize()),
        });
    }
    let leverage = if plan.leverage_clamped() {
        format!("{}x (needs {}x)", plan.leverage, plan.required_leverage)
    } else {
        format!("{}x", plan.leverage)
    };
    rows.push(field("Leverage", leverage));
    rows.push(field(
        "Risk",
        format!("{} ({}%)", money(plan.risk_amount), plan.risk_percent.normalize()),
    ));
    rows.push(field("Notional", money(plan.notional_value)));
    rows.push(field("Margin", money(plan.required_margin())));

    table(rows)
}

/// Resting order of `kind` for a symbol, used as a position's target
fn target<'a>(orders: &HashMap<&str, Vec<&'a Order>>, symbol: &str, kind: OrderKind) -> Option<&'a Order> {
    orders
        .get(symbol)
        .and_then(|list| list.iter().copied().find(|o| o.kind == kind))
}

pub fn render_positions(positions: &[Position], orders: &[Order]) -> String {
    if positions.is_empty() {
        return "No open positions".to_string();
    }

    let mut by_symbol: HashMap<&str, Vec<&Order>> = HashMap::new();
    for order in orders {
        by_symbol.entry(order.symbol.as_str()).or_default().push(order);
    }

    let rows = positions
        .iter()
        .map(|pos| {
            let distance = |kind| {
                target(&by_symbol, &pos.symbol, kind)
                    .map(|o| {
                        signed_percent(RiskCalculator::calculate_distance_to_price(
                            pos.side,
                            pos.mark_price,
                            o.effective_price(),
                        ))
                    })
                    .unwrap_or_else(|| "-".to_string())
            };

            PositionRow {
                symbol: pos.symbol.clone(),
                side: pos.side.to_string(),
                size: size(pos.size),
                entry: format!("{:.2}", pos.entry_price),
                mark: format!("{:.2}", pos.mark_price),
                pnl: signed_money(pos.unrealized_pnl),
                pnl_percent: signed_percent(RiskCalculator::calculate_pnl_percent(
                    pos.side,
                    pos.entry_price,
                    pos.mark_price,
                )),
                to_tp: distance(OrderKind::TakeProfit),
                to_sl: distance(OrderKind::Stop),
                leverage: format!("{}x", pos.leverage),
            }
        })
        .collect();

    table(rows)
}

/// Whether filling `order` would reduce `position`
fn closes(order: &Order, position: &Position) -> bool {
    match order.kind {
        OrderKind::TakeProfit | OrderKind::Stop => true,
        OrderKind::Limit => order.reduce_only || order.side == position.side.opposite(),
        OrderKind::Market | OrderKind::TrailingStop => false,
    }
}

fn expected_pnl(order: &Order, position: Option<&Position>) -> String {
    let Some(position) = position.filter(|p| closes(order, p)) else {
        return "-".to_string();
    };

    let (nominal, percent) = RiskCalculator::calculate_expected_pnl(
        position.side,
        position.entry_price,
        order.effective_price(),
        order.size,
    );
    format!("{} ({})", signed_money(nominal), signed_percent(percent))
}

pub fn render_orders(orders: &[Order], positions: &[Position], verbose: bool) -> String {
    if orders.is_empty() {
        return "No open orders".to_string();
    }

    let by_symbol: HashMap<&str, &Position> =
        positions.iter().map(|p| (p.symbol.as_str(), p)).collect();

    let rows = orders
        .iter()
        .map(|order| {
            let id = if verbose || order.id.chars().count() <= SHORT_ID_LEN {
                order.id.clone()
            } else {
                format!("{}...", order.id.chars().take(SHORT_ID_LEN).collect::<String>())
            };
            let price = if order.price.is_zero() && !order.stop_price.is_zero() {
                format!("@ {:.2}", order.stop_price)
            } else {
                format!("{:.2}", order.price)
            };

            OrderRow {
                id,
                symbol: order.symbol.clone(),
                side: order.side.to_string(),
                kind: order.kind.to_string(),
                size: size(order.size),
                price,
                expected_pnl: expected_pnl(order, by_symbol.get(order.symbol.as_str()).copied()),
            }
        })
        .collect();

    table(rows)
}

// ============================================================================
// Reports
// ============================================================================

fn render_result(result: &AccountResult, verbose: bool) -> String {
    let mut out = vec![format!("Account: {}", result.account)];

    for warning in &result.warnings {
        out.push(format!("  ⚠ {}", warning));
    }

    if let Some(plan) = &result.plan {
        out.push(render_plan(plan));
    }

    for action in &result.actions {
        let line = match &action.status {
            ActionStatus::Done { order_id: Some(id) } => {
                format!("  ✓ {} {} | order {}", action.symbol, action.description, id)
            }
            ActionStatus::Done { order_id: None } => {
                format!("  ✓ {} {}", action.symbol, action.description)
            }
            ActionStatus::Failed { error } => {
                format!("  ✗ {} {} failed: {}", action.symbol, action.description, error)
            }
        };
        out.push(line);
    }

    match &result.snapshot {
        Some(AccountSnapshot::Balance(balance)) => out.push(render_balance(balance)),
        Some(AccountSnapshot::Positions { positions, orders }) => {
            out.push(render_positions(positions, orders))
        }
        Some(AccountSnapshot::Orders { orders, positions }) => {
            out.push(render_orders(orders, positions, verbose))
        }
        None => {}
    }

    match &result.outcome {
        Outcome::Succeeded { order_ids } if result.actions.is_empty() && !order_ids.is_empty() => {
            out.push(format!("  ✓ order {}", order_ids.join(", ")))
        }
        Outcome::Succeeded { .. } => {}
        Outcome::Skipped { reason } => {
            out.push(format!("  • {}: {}", result.outcome.label(), reason))
        }
        Outcome::Failed { error } => out.push(format!("  ✗ {}", error)),
    }

    out.join("\n")
}

/// Full report: one block per account followed by a summary line
pub fn render_report(report: &BatchReport, verbose: bool) -> String {
    let mut blocks: Vec<String> = report
        .results
        .iter()
        .map(|r| render_result(r, verbose))
        .collect();

    blocks.push(format!(
        "{}: {} succeeded, {} skipped, {} failed",
        report.operation,
        report.succeeded(),
        report.skipped(),
        report.failed()
    ));
    blocks.join("\n\n")
}
