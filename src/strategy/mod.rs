//! Position planning
//!
//! Turns a validated open command plus an account's live balance into a fully
//! sized [`PositionPlan`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PURE (no I/O)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RiskCalculator                                             │
//! │    - size from risk budget and stop distance                │
//! │    - leverage, targets, PnL and distance metrics            │
//! │    - static stop-loss placement check                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PlanningStrategy (RiskRatioStrategy)                       │
//! │    PositionParams ──► PositionPlan                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`RiskCalculator`]: stateless position math
//! - [`PlanningStrategy`]: trait for sizing strategies
//! - [`RiskRatioStrategy`]: fixed risk/reward reference strategy
//! - [`PositionPlan`]: planner output consumed by the order builder

mod calculator;
mod risk_ratio;
mod traits;
mod types;

pub use calculator::RiskCalculator;
pub use risk_ratio::RiskRatioStrategy;
pub use traits::{BoxedPlanningStrategy, PlanningStrategy};
pub use types::{LeverageCalc, PositionParams, PositionPlan, StopLossLeg, TakeProfitLeg};
