//! Trading CLI Library
//!
//! Risk-sized position planning, command normalization and multi-account
//! order execution for leveraged perpetual futures.

pub mod bingx;
pub mod common;
pub mod config;
pub mod context;
pub mod execution;
pub mod intent;
pub mod nlp;
pub mod render;
pub mod strategy;
pub mod watch;

// Re-export commonly used types
pub use common::errors::{Result, TradingError};
pub use common::traits::{BoxedBroker, BrokerConnection};
pub use common::types::{
    Balance, EntryKind, Order, OrderAck, OrderFilter, OrderKind, OrderRequest, Position,
    PositionFilter, Side,
};
pub use config::types::AppConfig;
pub use context::TradingContext;
pub use execution::{AccountScope, BatchReport, Operation, Orchestrator, Outcome};
pub use intent::{CommandNormalizer, IntentKind, NormalizedCommand, ParsedCommand, RawIntent};
pub use nlp::{NlpProcessor, WitAiProcessor};
pub use strategy::{PlanningStrategy, PositionPlan, RiskCalculator, RiskRatioStrategy};
