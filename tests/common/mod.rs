//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trading_cli::common::errors::{Result, TradingError};
use trading_cli::common::traits::{single_position, BrokerConnection};
use trading_cli::common::types::{
    Balance, Order, OrderAck, OrderFilter, OrderKind, OrderRequest, Position, PositionFilter, Side,
};
use trading_cli::config::types::{Account, AppConfig, AppSettings, BrokerKind};
use trading_cli::execution::{AccountSession, Orchestrator};
use trading_cli::strategy::RiskRatioStrategy;

/// Broker calls a [`FakeBroker`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Balance,
    Price,
    Positions,
    Orders,
    Leverage,
    PlaceOrder,
    Cancel,
}

/// Everything a [`FakeBroker`] received and will answer
#[derive(Debug, Default)]
pub struct FakeState {
    pub balance: Option<Balance>,
    pub price: Decimal,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub failing: HashSet<Call>,
    /// Fail `place_order` only for requests of this kind
    pub failing_kind: Option<OrderKind>,
    pub placed: Vec<OrderRequest>,
    pub leverage_calls: Vec<(String, Side, u32)>,
    pub canceled: Vec<String>,
    pub next_id: u64,
}

/// Scriptable in-memory broker
///
/// Clones share state, so a test keeps one handle for assertions and hands
/// another to the orchestrator.
#[derive(Clone, Default)]
pub struct FakeBroker {
    pub state: Arc<Mutex<FakeState>>,
    pub delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeBroker {
    pub fn new() -> Self {
        let broker = Self::default();
        broker.with_state(|s| {
            s.balance = Some(balance(dec!(1000)));
            s.price = dec!(4000);
        });
        broker
    }

    pub fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
    }

    pub fn failing(self, call: Call) -> Self {
        self.with_state(|s| {
            s.failing.insert(call);
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shares the in-flight counters of `other`
    pub fn sharing_counters(mut self, other: &FakeBroker) -> Self {
        self.in_flight = other.in_flight.clone();
        self.peak = other.peak.clone();
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().placed.clone()
    }

    pub fn canceled(&self) -> Vec<String> {
        self.state.lock().unwrap().canceled.clone()
    }

    pub fn leverage_calls(&self) -> Vec<(String, Side, u32)> {
        self.state.lock().unwrap().leverage_calls.clone()
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.state.lock().unwrap().failing.contains(&call) {
            return Err(TradingError::Api {
                code: 500,
                message: format!("{:?} unavailable", call),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerConnection for FakeBroker {
    fn broker_name(&self) -> &'static str {
        "fake"
    }

    async fn get_balance(&self) -> Result<Balance> {
        self.enter(Call::Balance).await?;
        self.state
            .lock()
            .unwrap()
            .balance
            .clone()
            .ok_or_else(|| TradingError::InvalidResponse("no balance".to_string()))
    }

    async fn get_current_price(&self, _symbol: &str) -> Result<Decimal> {
        self.enter(Call::Price).await?;
        Ok(self.state.lock().unwrap().price)
    }

    async fn get_positions(&self, filter: &PositionFilter) -> Result<Vec<Position>> {
        self.enter(Call::Positions).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .positions
            .iter()
            .filter(|p| filter.symbol.as_deref().map_or(true, |s| s == p.symbol))
            .cloned()
            .collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        self.enter(Call::Positions).await?;
        let positions = self.state.lock().unwrap().positions.clone();
        single_position(symbol, positions)
    }

    async fn get_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.enter(Call::Orders).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .orders
            .iter()
            .filter(|o| filter.symbol.as_deref().map_or(true, |s| s == o.symbol))
            .cloned()
            .collect())
    }

    async fn set_leverage(&self, symbol: &str, side: Side, leverage: u32) -> Result<()> {
        self.enter(Call::Leverage).await?;
        self.state
            .lock()
            .unwrap()
            .leverage_calls
            .push((symbol.to_string(), side, leverage));
        Ok(())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        self.enter(Call::PlaceOrder).await?;
        let mut state = self.state.lock().unwrap();
        if state.failing_kind == Some(request.kind) {
            return Err(TradingError::Api {
                code: 80001,
                message: format!("{} rejected", request.kind),
            });
        }
        state.next_id += 1;
        state.placed.push(request.clone());
        Ok(OrderAck {
            order_id: format!("ord-{}", state.next_id),
            symbol: request.symbol.clone(),
            status: "NEW".to_string(),
        })
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        self.enter(Call::Cancel).await?;
        let mut state = self.state.lock().unwrap();
        state.orders.retain(|o| o.symbol != symbol);
        state.canceled.push(symbol.to_string());
        Ok(())
    }
}

pub fn balance(available: Decimal) -> Balance {
    Balance {
        asset: "USDT".to_string(),
        total: available,
        available,
        in_use: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
    }
}

pub fn position(symbol: &str, side: Side, size: Decimal, entry: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        side,
        size,
        entry_price: entry,
        mark_price: entry,
        unrealized_pnl: Decimal::ZERO,
        leverage: 5,
    }
}

pub fn account(name: &str) -> Account {
    Account {
        name: name.to_string(),
        api_key: format!("{}-key", name),
        secret_key: format!("{}-secret", name),
        broker: BrokerKind::Bingx,
        demo: true,
        enabled: true,
    }
}

pub fn config(names: &[&str]) -> AppConfig {
    AppConfig {
        accounts: names.iter().map(|n| account(n)).collect(),
        settings: AppSettings::default(),
        nlp: Default::default(),
    }
}

/// Sessions over fake brokers, in the given order
pub fn sessions(brokers: &[(&str, FakeBroker)]) -> Vec<AccountSession> {
    brokers
        .iter()
        .map(|(name, broker)| AccountSession::new(account(name), Box::new(broker.clone())))
        .collect()
}

pub fn orchestrator(brokers: &[(&str, FakeBroker)], settings: AppSettings) -> Orchestrator {
    let strategy = RiskRatioStrategy::new(settings.default_rr_ratio)
        .with_levels(settings.take_profit_levels.clone());
    Orchestrator::new(sessions(brokers), settings, Box::new(strategy))
}

/// Sample BingX responses for wire-level tests
pub mod bingx_responses {
    pub const BALANCE: &str = r#"{
        "code": 0,
        "msg": "",
        "data": {
            "balance": {
                "asset": "USDT",
                "balance": "1000.00",
                "equity": "1012.50",
                "unrealizedProfit": "12.50",
                "availableMargin": "900.00",
                "usedMargin": "100.00"
            }
        }
    }"#;

    pub const PRICE: &str = r#"{"code": 0, "msg": "", "data": {"symbol": "ETH-USDT", "price": "4000.5"}}"#;

    pub const POSITIONS: &str = r#"{
        "code": 0,
        "msg": "",
        "data": [
            {
                "symbol": "ETH-USDT",
                "positionSide": "LONG",
                "positionAmt": "0.4",
                "avgPrice": "3950",
                "markPrice": "4000",
                "unrealizedProfit": "20",
                "leverage": 2
            },
            {
                "symbol": "BTC-USDT",
                "positionSide": "SHORT",
                "positionAmt": "0",
                "avgPrice": "0",
                "markPrice": "60000",
                "unrealizedProfit": "0",
                "leverage": 10
            }
        ]
    }"#;

    pub const PLACED: &str = r#"{"code": 0, "msg": "", "data": {"order": {"orderId": 1736011111111111111, "symbol": "ETH-USDT", "status": "NEW"}}}"#;

    pub const AUTH_ERROR: &str = r#"{"code": 100001, "msg": "Signature verification failed"}"#;

    pub const INSUFFICIENT: &str = r#"{"code": 101204, "msg": "Insufficient margin"}"#;

    pub const EMPTY_OK: &str = r#"{"code": 0, "msg": ""}"#;
}
