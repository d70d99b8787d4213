//! Multi-account orchestration
//!
//! One operation fans out to every selected account as an independent unit of
//! work. Each unit holds its account's connection for the whole pipeline, turns
//! every broker error into that account's result, and never affects siblings.

use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::operation::{AccountScope, OpenRequest, Operation};
use super::order_builder::OrderBuilder;
use super::report::{AccountResult, AccountSnapshot, ActionRecord, BatchReport, Outcome};
use super::session::AccountSession;
use super::validator::validate_against_market;
use crate::common::errors::{Result, TradingError};
use crate::common::traits::BrokerConnection;
use crate::common::types::{OrderFilter, Position, PositionFilter};
use crate::config::types::AppSettings;
use crate::strategy::{BoxedPlanningStrategy, PositionParams};

/// Runs operations across account sessions
pub struct Orchestrator {
    sessions: Vec<AccountSession>,
    settings: AppSettings,
    strategy: BoxedPlanningStrategy,
}

impl Orchestrator {
    pub fn new(
        sessions: Vec<AccountSession>,
        settings: AppSettings,
        strategy: BoxedPlanningStrategy,
    ) -> Self {
        Self {
            sessions,
            settings,
            strategy,
        }
    }

    fn select(&self, scope: &AccountScope) -> Result<Vec<&AccountSession>> {
        if self.sessions.is_empty() {
            return Err(TradingError::NoAccountsEnabled);
        }

        match scope {
            AccountScope::All => Ok(self.sessions.iter().collect()),
            AccountScope::Named(name) => self
                .sessions
                .iter()
                .find(|s| s.name() == name)
                .map(|s| vec![s])
                .ok_or_else(|| TradingError::AccountNotFound(name.clone())),
        }
    }

    /// Run `operation` on every account in `scope`
    ///
    /// Returns one result per selected account, in configuration order.
    /// Only "no accounts enabled" and an unknown scoped account fail the
    /// whole call; everything else lands in the per-account results.
    pub async fn execute(&self, operation: &Operation, scope: &AccountScope) -> Result<BatchReport> {
        let selected = self.select(scope)?;
        let concurrency = self.settings.max_concurrency.max(1);

        info!(
            operation = operation.name(),
            accounts = selected.len(),
            concurrency,
            "Dispatching operation"
        );

        let mut indexed: Vec<(usize, AccountResult)> = stream::iter(
            selected
                .into_iter()
                .enumerate()
                .map(|(index, session)| async move { (index, self.run_account(session, operation).await) }),
        )
        .buffer_unordered(concurrency)
        .collect()
        .await;

        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<AccountResult> = indexed.into_iter().map(|(_, result)| result).collect();

        let report = BatchReport::new(operation.name(), results);
        info!(
            operation = operation.name(),
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Operation finished"
        );
        Ok(report)
    }

    async fn run_account(&self, session: &AccountSession, operation: &Operation) -> AccountResult {
        let account = session.name();
        let guard = session.lock().await;
        let broker: &dyn BrokerConnection = guard.as_ref();
        debug!(
            account,
            broker = broker.broker_name(),
            operation = operation.name(),
            "Running account pipeline"
        );

        let result = match operation {
            Operation::Open(request) => self.open(account, broker, request).await,
            Operation::Close { symbol, percentage } => {
                close(account, broker, symbol.as_deref(), *percentage).await
            }
            Operation::ViewPositions { symbol } => view_positions(account, broker, symbol.clone()).await,
            Operation::ViewOrders { symbol } => view_orders(account, broker, symbol.clone()).await,
            Operation::Cancel { symbol } => cancel(account, broker, symbol.as_deref()).await,
            Operation::TrailingStop {
                symbol,
                activation_price,
                callback_rate,
            } => trailing_stop(account, broker, symbol, *activation_price, *callback_rate).await,
            Operation::BreakEven { symbol } => break_even(account, broker, symbol).await,
            Operation::Balance => balance(account, broker).await,
        };

        if let Outcome::Failed { error } = &result.outcome {
            warn!(account, operation = operation.name(), %error, "Account operation failed");
        }
        result
    }

    // ========================================================================
    // Open
    // ========================================================================

    async fn open(
        &self,
        account: &str,
        broker: &dyn BrokerConnection,
        request: &OpenRequest,
    ) -> AccountResult {
        let symbol = request.symbol.as_str();

        let balance = match broker.get_balance().await {
            Ok(b) => b,
            Err(e) => return AccountResult::failed(account, format!("failed to get balance: {}", e)),
        };

        let current_price = match broker.get_current_price(symbol).await {
            Ok(p) => p,
            Err(e) => return AccountResult::failed(account, format!("failed to get price: {}", e)),
        };

        let mut warnings = match validate_against_market(
            request.side,
            request.entry_price,
            current_price,
            request.entry_kind,
            self.settings.price_deviation_warn_percent,
        ) {
            Ok(w) => w,
            Err(e) => return AccountResult::failed(account, format!("invalid price logic: {}", e)),
        };

        let params = PositionParams {
            symbol: request.symbol.clone(),
            side: request.side,
            entry_price: request.entry_price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            rr_ratio: request.rr_ratio,
            account_balance: balance.available,
            risk_percent: request.risk_percent,
            max_leverage: self.settings.max_leverage,
            leverage_policy: self.settings.leverage_policy,
            entry_kind: request.entry_kind,
        };

        let plan = match self.strategy.calculate_position(&params) {
            Ok(p) => p,
            Err(e) => {
                return AccountResult::failed(account, format!("position calculation failed: {}", e))
                    .with_warnings(warnings)
            }
        };

        if plan.leverage_clamped() {
            warnings.push(format!(
                "required leverage {}x exceeds maximum, clamped to {}x",
                plan.required_leverage, plan.leverage
            ));
        }

        if let Err(e) = broker.set_leverage(symbol, plan.side, plan.leverage).await {
            return AccountResult::failed(account, format!("failed to set leverage: {}", e))
                .with_plan(plan)
                .with_warnings(warnings);
        }

        let entry = OrderBuilder::build_entry_order(&plan);
        let ack = match broker.place_order(&entry).await {
            Ok(ack) => ack,
            Err(e) => {
                return AccountResult::failed(account, format!("failed to place order: {}", e))
                    .with_plan(plan)
                    .with_warnings(warnings)
            }
        };
        info!(account, symbol, order_id = %ack.order_id, "Entry order placed");

        let mut actions = vec![ActionRecord::done(
            symbol,
            format!("{} {} entry, {} @ {}", plan.side, entry.kind, plan.size, plan.entry_price),
            Some(ack.order_id.clone()),
        )];
        let mut order_ids = vec![ack.order_id];

        // Extra targets only make sense once the entry is accepted
        let scale_out = OrderBuilder::build_scale_out_orders(&plan);
        let total = plan.take_profits.len();
        for (i, order) in scale_out.iter().enumerate() {
            let label = format!("take profit {}/{} @ {}", i + 2, total, order.stop_price.unwrap_or_default());
            match broker.place_order(order).await {
                Ok(ack) => {
                    actions.push(ActionRecord::done(symbol, label, Some(ack.order_id.clone())));
                    order_ids.push(ack.order_id);
                }
                Err(e) => {
                    warnings.push(format!("{} not placed: {}", label, e));
                    actions.push(ActionRecord::failed(symbol, label, e.to_string()));
                }
            }
        }

        AccountResult::succeeded(account, order_ids)
            .with_plan(plan)
            .with_actions(actions)
            .with_warnings(warnings)
    }
}

// ============================================================================
// Position management
// ============================================================================

async fn close_one(
    broker: &dyn BrokerConnection,
    position: &Position,
    percentage: Option<Decimal>,
) -> ActionRecord {
    let order = OrderBuilder::build_close_order(position, percentage);
    let description = match percentage {
        Some(p) if order.size < position.size => {
            format!("closed {}% of {} position ({})", p.normalize(), position.side, order.size)
        }
        _ => format!("closed {} position ({})", position.side, order.size),
    };

    match broker.place_order(&order).await {
        Ok(ack) => ActionRecord::done(&position.symbol, description, Some(ack.order_id)),
        Err(e) => ActionRecord::failed(&position.symbol, "close", e.to_string()),
    }
}

async fn close(
    account: &str,
    broker: &dyn BrokerConnection,
    symbol: Option<&str>,
    percentage: Option<Decimal>,
) -> AccountResult {
    let positions = match symbol {
        Some(symbol) => match broker.get_position(symbol).await {
            Ok(Some(position)) => vec![position],
            Ok(None) => return AccountResult::skipped(account, format!("no position found for {}", symbol)),
            Err(e) => return AccountResult::failed(account, format!("failed to get position: {}", e)),
        },
        None => match broker.get_positions(&PositionFilter::all()).await {
            Ok(positions) if positions.is_empty() => {
                return AccountResult::skipped(account, "no positions to close")
            }
            Ok(positions) => positions,
            Err(e) => return AccountResult::failed(account, format!("failed to get positions: {}", e)),
        },
    };

    let mut actions = Vec::with_capacity(positions.len());
    for position in &positions {
        actions.push(close_one(broker, position, percentage).await);
    }
    AccountResult::from_actions(account, actions)
}

async fn cancel(account: &str, broker: &dyn BrokerConnection, symbol: Option<&str>) -> AccountResult {
    let symbols: Vec<String> = match symbol {
        Some(symbol) => vec![symbol.to_string()],
        None => match broker.get_positions(&PositionFilter::all()).await {
            Ok(positions) if positions.is_empty() => {
                return AccountResult::skipped(account, "no positions with orders to cancel")
            }
            Ok(positions) => positions.into_iter().map(|p| p.symbol).collect(),
            Err(e) => return AccountResult::failed(account, format!("failed to get positions: {}", e)),
        },
    };

    let mut actions = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let action = match broker.cancel_all_orders(&symbol).await {
            Ok(()) => ActionRecord::done(&symbol, "canceled all orders", None),
            Err(e) => ActionRecord::failed(&symbol, "cancel", e.to_string()),
        };
        actions.push(action);
    }
    AccountResult::from_actions(account, actions)
}

/// Position for a symbol, or the finished result when there is none
async fn require_position(
    account: &str,
    broker: &dyn BrokerConnection,
    symbol: &str,
) -> std::result::Result<Position, AccountResult> {
    match broker.get_position(symbol).await {
        Ok(Some(position)) => Ok(position),
        Ok(None) => Err(AccountResult::skipped(
            account,
            format!("no position found for {}", symbol),
        )),
        Err(e) => Err(AccountResult::failed(
            account,
            format!("failed to get position: {}", e),
        )),
    }
}

async fn trailing_stop(
    account: &str,
    broker: &dyn BrokerConnection,
    symbol: &str,
    activation_price: Decimal,
    callback_rate: Decimal,
) -> AccountResult {
    let position = match require_position(account, broker, symbol).await {
        Ok(p) => p,
        Err(result) => return result,
    };

    let order = OrderBuilder::build_trailing_stop_order(&position, activation_price, callback_rate);
    let description = format!(
        "trailing stop, activation {} callback {}%",
        activation_price,
        callback_rate.normalize()
    );
    let action = match broker.place_order(&order).await {
        Ok(ack) => ActionRecord::done(symbol, description, Some(ack.order_id)),
        Err(e) => ActionRecord::failed(symbol, "trailing stop", e.to_string()),
    };
    AccountResult::from_actions(account, vec![action])
}

async fn break_even(account: &str, broker: &dyn BrokerConnection, symbol: &str) -> AccountResult {
    let position = match require_position(account, broker, symbol).await {
        Ok(p) => p,
        Err(result) => return result,
    };

    // Existing stop must go before the new one is placed
    if let Err(e) = broker.cancel_all_orders(symbol).await {
        return AccountResult::failed(account, format!("failed to cancel existing orders: {}", e));
    }

    let order = OrderBuilder::build_break_even_order(&position);
    let action = match broker.place_order(&order).await {
        Ok(ack) => ActionRecord::done(
            symbol,
            format!("stop moved to entry {}", position.entry_price),
            Some(ack.order_id),
        ),
        Err(e) => ActionRecord::failed(symbol, "break even stop", e.to_string()),
    };
    AccountResult::from_actions(account, vec![action])
}

// ============================================================================
// Read-only
// ============================================================================

async fn balance(account: &str, broker: &dyn BrokerConnection) -> AccountResult {
    match broker.get_balance().await {
        Ok(balance) => {
            AccountResult::succeeded(account, Vec::new()).with_snapshot(AccountSnapshot::Balance(balance))
        }
        Err(e) => AccountResult::failed(account, format!("failed to get balance: {}", e)),
    }
}

async fn view_positions(account: &str, broker: &dyn BrokerConnection, symbol: Option<String>) -> AccountResult {
    let positions = match broker.get_positions(&PositionFilter::from(symbol.clone())).await {
        Ok(p) => p,
        Err(e) => return AccountResult::failed(account, format!("failed to get positions: {}", e)),
    };

    // Orders only decorate the view with targets
    let orders = broker
        .get_orders(&OrderFilter::from(symbol))
        .await
        .unwrap_or_else(|e| {
            warn!(account, error = %e, "Could not load orders for position targets");
            Vec::new()
        });

    AccountResult::succeeded(account, Vec::new())
        .with_snapshot(AccountSnapshot::Positions { positions, orders })
}

async fn view_orders(account: &str, broker: &dyn BrokerConnection, symbol: Option<String>) -> AccountResult {
    let orders = match broker.get_orders(&OrderFilter::from(symbol.clone())).await {
        Ok(o) => o,
        Err(e) => return AccountResult::failed(account, format!("failed to get orders: {}", e)),
    };

    let positions = broker
        .get_positions(&PositionFilter::from(symbol))
        .await
        .unwrap_or_else(|e| {
            warn!(account, error = %e, "Could not load positions for expected PnL");
            Vec::new()
        });

    AccountResult::succeeded(account, Vec::new())
        .with_snapshot(AccountSnapshot::Orders { orders, positions })
}
