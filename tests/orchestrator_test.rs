//! Multi-account orchestration against in-memory brokers

mod common;

use common::{balance, orchestrator, position, Call, FakeBroker};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::time::Duration;
use test_log::test;

use trading_cli::common::types::{EntryKind, OrderKind, Side};
use trading_cli::config::types::{AppSettings, LeveragePolicy, TakeProfitLevel};
use trading_cli::execution::{AccountScope, AccountSnapshot, OpenRequest, Operation, Outcome};
use trading_cli::TradingError;

fn open_eth_long() -> Operation {
    Operation::Open(OpenRequest {
        symbol: "ETH-USDT".to_string(),
        side: Side::Long,
        entry_price: dec!(3950),
        stop_loss: dec!(3900),
        take_profit: None,
        risk_percent: dec!(2),
        rr_ratio: None,
        entry_kind: EntryKind::Limit,
    })
}

// ============================================================================
// Isolation
// ============================================================================

#[test(tokio::test)]
async fn test_one_failing_account_does_not_block_others() {
    let a = FakeBroker::new();
    let b = FakeBroker::new().failing(Call::Balance);
    let c = FakeBroker::new();

    let orch = orchestrator(
        &[("a", a.clone()), ("b", b.clone()), ("c", c.clone())],
        AppSettings::default(),
    );
    let report = orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();

    let names: Vec<_> = report.results.iter().map(|r| r.account.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(report.results[0].is_succeeded());
    assert!(report.results[1].is_failed());
    assert!(report.results[2].is_succeeded());
    assert!(report.is_partial_failure());

    assert!(b.placed().is_empty());
    assert!(b.leverage_calls().is_empty());

    // same run without the failing account
    let base_a = FakeBroker::new();
    let base_c = FakeBroker::new();
    let baseline = orchestrator(
        &[("a", base_a.clone()), ("c", base_c.clone())],
        AppSettings::default(),
    )
    .execute(&open_eth_long(), &AccountScope::All)
    .await
    .unwrap();

    assert_eq!(report.results[0], baseline.results[0]);
    assert_eq!(report.results[2], baseline.results[1]);
    assert_eq!(a.placed(), base_a.placed());
    assert_eq!(c.placed(), base_c.placed());
    assert_eq!(a.leverage_calls(), base_a.leverage_calls());
    assert_eq!(c.leverage_calls(), base_c.leverage_calls());
    assert_eq!(a.placed().len(), 1);
}

#[test(tokio::test)]
async fn test_each_account_sizes_from_its_own_balance() {
    let small = FakeBroker::new();
    small.with_state(|s| s.balance = Some(balance(dec!(500))));
    let large = FakeBroker::new();
    large.with_state(|s| s.balance = Some(balance(dec!(2000))));

    let orch = orchestrator(
        &[("small", small.clone()), ("large", large.clone())],
        AppSettings::default(),
    );
    orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();

    // risk 2% over a 50-point stop
    assert_eq!(small.placed()[0].size, dec!(0.2));
    assert_eq!(large.placed()[0].size, dec!(0.8));
}

#[test(tokio::test)]
async fn test_results_keep_configuration_order_despite_latency() {
    let slow = FakeBroker::new().with_delay(Duration::from_millis(40));
    let fast = FakeBroker::new();

    let orch = orchestrator(&[("slow", slow), ("fast", fast)], AppSettings::default());
    let report = orch.execute(&Operation::Balance, &AccountScope::All).await.unwrap();

    assert_eq!(report.results[0].account, "slow");
    assert_eq!(report.results[1].account, "fast");
}

#[test(tokio::test)]
async fn test_concurrency_is_bounded() {
    let first = FakeBroker::new().with_delay(Duration::from_millis(20));
    let brokers: Vec<FakeBroker> = (0..6)
        .map(|_| {
            FakeBroker::new()
                .with_delay(Duration::from_millis(20))
                .sharing_counters(&first)
        })
        .collect();
    let named: Vec<(String, FakeBroker)> = brokers
        .into_iter()
        .enumerate()
        .map(|(i, b)| (format!("acct-{}", i), b))
        .collect();
    let refs: Vec<(&str, FakeBroker)> = named.iter().map(|(n, b)| (n.as_str(), b.clone())).collect();

    let settings = AppSettings {
        max_concurrency: 2,
        ..AppSettings::default()
    };
    let orch = orchestrator(&refs, settings);
    let report = orch.execute(&Operation::Balance, &AccountScope::All).await.unwrap();

    assert_eq!(report.succeeded(), 6);
    assert!(first.peak_in_flight() <= 2, "peak {}", first.peak_in_flight());
    assert!(first.peak_in_flight() >= 1);
}

// ============================================================================
// Scope
// ============================================================================

#[test(tokio::test)]
async fn test_named_scope_runs_one_account() {
    let a = FakeBroker::new();
    let b = FakeBroker::new();
    let orch = orchestrator(&[("a", a.clone()), ("b", b.clone())], AppSettings::default());

    let report = orch
        .execute(&open_eth_long(), &AccountScope::Named("b".to_string()))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].account, "b");
    assert!(a.placed().is_empty());
    assert_eq!(b.placed().len(), 1);
}

#[test(tokio::test)]
async fn test_unknown_account_and_no_accounts_are_fatal() {
    let orch = orchestrator(&[("a", FakeBroker::new())], AppSettings::default());
    let err = orch
        .execute(&Operation::Balance, &AccountScope::Named("zzz".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, TradingError::AccountNotFound(_)));

    let empty = orchestrator(&[], AppSettings::default());
    let err = empty.execute(&Operation::Balance, &AccountScope::All).await.unwrap_err();
    assert!(matches!(err, TradingError::NoAccountsEnabled));
}

// ============================================================================
// Open
// ============================================================================

#[test(tokio::test)]
async fn test_open_places_entry_with_attached_legs() {
    let broker = FakeBroker::new();
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let report = orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();
    let result = &report.results[0];

    assert_eq!(
        result.outcome,
        Outcome::Succeeded {
            order_ids: vec!["ord-1".to_string()]
        }
    );
    assert_eq!(broker.leverage_calls(), vec![("ETH-USDT".to_string(), Side::Long, 2)]);

    let entry = &broker.placed()[0];
    assert_eq!(entry.kind, OrderKind::Limit);
    assert_eq!(entry.price, Some(dec!(3950)));
    assert_eq!(entry.size, dec!(0.4));
    assert_eq!(entry.stop_loss.as_ref().unwrap().trigger_price, dec!(3900));
    assert_eq!(entry.take_profit.as_ref().unwrap().trigger_price, dec!(4050));
    assert!(!entry.reduce_only);
}

#[test(tokio::test)]
async fn test_open_limit_short_below_market_is_rejected() {
    let broker = FakeBroker::new();
    broker.with_state(|s| s.price = dec!(4000));
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::Open(OpenRequest {
        symbol: "ETH-USDT".to_string(),
        side: Side::Short,
        entry_price: dec!(3950),
        stop_loss: dec!(4000),
        take_profit: None,
        risk_percent: dec!(1),
        rr_ratio: None,
        entry_kind: EntryKind::Limit,
    });
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    assert!(report.is_total_failure());
    assert!(broker.placed().is_empty());
    assert!(broker.leverage_calls().is_empty());
}

#[test(tokio::test)]
async fn test_open_at_market_skips_immediate_execution_check() {
    let broker = FakeBroker::new();
    broker.with_state(|s| s.price = dec!(3900));
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::Open(OpenRequest {
        entry_price: dec!(3950),
        stop_loss: dec!(3900),
        entry_kind: EntryKind::Market,
        ..match open_eth_long() {
            Operation::Open(req) => req,
            _ => unreachable!(),
        }
    });
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    assert!(report.results[0].is_succeeded());
    assert_eq!(broker.placed()[0].kind, OrderKind::Market);
    assert_eq!(broker.placed()[0].price, None);
}

#[test(tokio::test)]
async fn test_open_warns_on_wide_deviation() {
    let broker = FakeBroker::new();
    broker.with_state(|s| s.price = dec!(4400));
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let report = orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();
    let result = &report.results[0];

    assert!(result.is_succeeded());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("away from current price"));
}

#[test(tokio::test)]
async fn test_open_clamps_or_aborts_excess_leverage() {
    let tight = || {
        Operation::Open(OpenRequest {
            symbol: "BTC-USDT".to_string(),
            side: Side::Long,
            entry_price: dec!(50000),
            stop_loss: dec!(49950),
            take_profit: None,
            risk_percent: dec!(1),
            rr_ratio: None,
            entry_kind: EntryKind::Limit,
        })
    };

    let broker = FakeBroker::new();
    broker.with_state(|s| s.price = dec!(50100));
    let clamp = AppSettings {
        max_leverage: 5,
        ..AppSettings::default()
    };
    let orch = orchestrator(&[("main", broker.clone())], clamp);
    let report = orch.execute(&tight(), &AccountScope::All).await.unwrap();

    let result = &report.results[0];
    assert!(result.is_succeeded());
    assert_eq!(broker.leverage_calls()[0].2, 5);
    assert!(result.warnings.iter().any(|w| w.contains("clamped to 5x")));

    let broker = FakeBroker::new();
    broker.with_state(|s| s.price = dec!(50100));
    let abort = AppSettings {
        max_leverage: 5,
        leverage_policy: LeveragePolicy::Abort,
        ..AppSettings::default()
    };
    let orch = orchestrator(&[("main", broker.clone())], abort);
    let report = orch.execute(&tight(), &AccountScope::All).await.unwrap();

    assert!(report.results[0].is_failed());
    assert!(broker.placed().is_empty());
}

#[test(tokio::test)]
async fn test_open_with_scale_out_levels() {
    let broker = FakeBroker::new();
    let settings = AppSettings {
        take_profit_levels: vec![
            TakeProfitLevel {
                rr_ratio: dec!(1),
                fraction: dec!(0.5),
            },
            TakeProfitLevel {
                rr_ratio: dec!(3),
                fraction: dec!(0.5),
            },
        ],
        ..AppSettings::default()
    };
    let orch = orchestrator(&[("main", broker.clone())], settings);

    let report = orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();
    let result = &report.results[0];
    assert!(result.is_succeeded());

    let placed = broker.placed();
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].take_profit.as_ref().unwrap().trigger_price, dec!(4000));

    let second = &placed[1];
    assert_eq!(second.kind, OrderKind::TakeProfit);
    assert_eq!(second.side, Side::Short);
    assert!(second.reduce_only);
    assert_eq!(second.stop_price, Some(dec!(4100)));
    assert_eq!(second.size, dec!(0.2));
}

#[test(tokio::test)]
async fn test_failed_scale_out_leg_keeps_entry() {
    let broker = FakeBroker::new();
    broker.with_state(|s| s.failing_kind = Some(OrderKind::TakeProfit));
    let settings = AppSettings {
        take_profit_levels: vec![
            TakeProfitLevel {
                rr_ratio: dec!(1),
                fraction: dec!(0.5),
            },
            TakeProfitLevel {
                rr_ratio: dec!(2),
                fraction: dec!(0.5),
            },
        ],
        ..AppSettings::default()
    };
    let orch = orchestrator(&[("main", broker.clone())], settings);

    let report = orch.execute(&open_eth_long(), &AccountScope::All).await.unwrap();
    let result = &report.results[0];

    assert!(result.is_succeeded());
    assert_eq!(broker.placed().len(), 1);
    assert!(result.actions.iter().any(|a| a.is_failed()));
    assert!(result.warnings.iter().any(|w| w.contains("not placed")));
}

// ============================================================================
// Position management
// ============================================================================

#[test(tokio::test)]
async fn test_close_half_of_position() {
    let broker = FakeBroker::new();
    broker.with_state(|s| {
        s.positions = vec![position("ETH-USDT", Side::Long, dec!(0.4), dec!(3950))];
    });
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::Close {
        symbol: Some("ETH-USDT".to_string()),
        percentage: Some(dec!(50)),
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();
    assert!(report.results[0].is_succeeded());

    let order = &broker.placed()[0];
    assert_eq!(order.kind, OrderKind::Market);
    assert_eq!(order.side, Side::Short);
    assert_eq!(order.size, dec!(0.2));
    assert!(order.reduce_only);
}

#[test(tokio::test)]
async fn test_close_all_positions_and_empty_account() {
    let busy = FakeBroker::new();
    busy.with_state(|s| {
        s.positions = vec![
            position("ETH-USDT", Side::Long, dec!(0.4), dec!(3950)),
            position("BTC-USDT", Side::Short, dec!(0.01), dec!(60000)),
        ];
    });
    let idle = FakeBroker::new();

    let orch = orchestrator(&[("busy", busy.clone()), ("idle", idle)], AppSettings::default());
    let op = Operation::Close {
        symbol: None,
        percentage: None,
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    assert!(report.results[0].is_succeeded());
    assert_eq!(report.results[0].actions.len(), 2);
    assert_eq!(busy.placed()[1].size, dec!(0.01));
    assert_eq!(busy.placed()[1].side, Side::Long);
    assert_eq!(
        report.results[1].outcome,
        Outcome::Skipped {
            reason: "no positions to close".to_string()
        }
    );
}

#[test(tokio::test)]
async fn test_missing_position_is_skipped_per_account() {
    let holder = FakeBroker::new();
    holder.with_state(|s| {
        s.positions = vec![position("ETH-USDT", Side::Long, dec!(0.4), dec!(3950))];
    });
    let other = FakeBroker::new();

    let orch = orchestrator(&[("holder", holder.clone()), ("other", other)], AppSettings::default());
    let op = Operation::TrailingStop {
        symbol: "ETH-USDT".to_string(),
        activation_price: dec!(4100),
        callback_rate: dec!(0.5),
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    assert!(report.results[0].is_succeeded());
    assert!(report.results[1].is_skipped());
    assert!(!report.is_partial_failure());

    let trailing = &holder.placed()[0];
    assert_eq!(trailing.kind, OrderKind::TrailingStop);
    let config = trailing.trailing.as_ref().unwrap();
    assert_eq!(config.activation_price, dec!(4100));
    assert_eq!(config.callback_rate, dec!(0.005));
}

#[test(tokio::test)]
async fn test_break_even_replaces_orders_with_entry_stop() {
    let broker = FakeBroker::new();
    broker.with_state(|s| {
        s.positions = vec![position("ETH-USDT", Side::Short, dec!(1), dec!(4000))];
    });
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::BreakEven {
        symbol: "ETH-USDT".to_string(),
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();
    assert!(report.results[0].is_succeeded());

    assert_eq!(broker.canceled(), vec!["ETH-USDT".to_string()]);
    let stop = &broker.placed()[0];
    assert_eq!(stop.kind, OrderKind::Stop);
    assert_eq!(stop.side, Side::Long);
    assert_eq!(stop.stop_price, Some(dec!(4000)));
    assert_eq!(stop.size, dec!(1));
}

#[test(tokio::test)]
async fn test_break_even_stops_when_cancel_fails() {
    let broker = FakeBroker::new().failing(Call::Cancel);
    broker.with_state(|s| {
        s.positions = vec![position("ETH-USDT", Side::Long, dec!(1), dec!(4000))];
    });
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::BreakEven {
        symbol: "ETH-USDT".to_string(),
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    assert!(report.results[0].is_failed());
    assert!(broker.placed().is_empty());
}

#[test(tokio::test)]
async fn test_break_even_refuses_hedged_symbol() {
    let broker = FakeBroker::new();
    broker.with_state(|s| {
        s.positions = vec![
            position("ETH-USDT", Side::Long, dec!(1), dec!(4000)),
            position("ETH-USDT", Side::Short, dec!(0.5), dec!(4100)),
        ];
    });
    let orch = orchestrator(&[("main", broker.clone())], AppSettings::default());

    let op = Operation::BreakEven {
        symbol: "ETH-USDT".to_string(),
    };
    let report = orch.execute(&op, &AccountScope::All).await.unwrap();

    match &report.results[0].outcome {
        Outcome::Failed { error } => assert!(error.contains("both long and short"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(broker.canceled().is_empty());
    assert!(broker.placed().is_empty());
}

#[test(tokio::test)]
async fn test_cancel_without_symbol_uses_open_positions() {
    let broker = FakeBroker::new();
    broker.with_state(|s| {
        s.positions = vec![
            position("ETH-USDT", Side::Long, dec!(0.4), dec!(3950)),
            position("SOL-USDT", Side::Long, dec!(10), dec!(150)),
        ];
    });
    let idle = FakeBroker::new();
    let orch = orchestrator(&[("main", broker.clone()), ("idle", idle)], AppSettings::default());

    let report = orch
        .execute(&Operation::Cancel { symbol: None }, &AccountScope::All)
        .await
        .unwrap();

    assert_eq!(
        broker.canceled(),
        vec!["ETH-USDT".to_string(), "SOL-USDT".to_string()]
    );
    assert_eq!(
        report.results[1].outcome,
        Outcome::Skipped {
            reason: "no positions with orders to cancel".to_string()
        }
    );
}

// ============================================================================
// Views
// ============================================================================

#[test(tokio::test)]
async fn test_orders_view_tolerates_position_failure() {
    let broker = FakeBroker::new().failing(Call::Positions);
    let orch = orchestrator(&[("main", broker)], AppSettings::default());

    let report = orch
        .execute(&Operation::ViewOrders { symbol: None }, &AccountScope::All)
        .await
        .unwrap();

    let result = &report.results[0];
    assert!(result.is_succeeded());
    assert_eq!(
        result.snapshot,
        Some(AccountSnapshot::Orders {
            orders: vec![],
            positions: vec![],
        })
    );
}

#[test(tokio::test)]
async fn test_balance_view_failure_is_reported_per_account() {
    let orch = orchestrator(
        &[
            ("ok", FakeBroker::new()),
            ("down", FakeBroker::new().failing(Call::Balance)),
        ],
        AppSettings::default(),
    );

    let report = orch.execute(&Operation::Balance, &AccountScope::All).await.unwrap();
    assert!(matches!(
        report.results[0].snapshot,
        Some(AccountSnapshot::Balance(_))
    ));
    assert!(report.results[1].is_failed());
}
