use serde::Serialize;

use crate::common::types::{Balance, Order, Position};
use crate::strategy::PositionPlan;

/// Three-way outcome of one operation on one account
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { order_ids: Vec<String> },
    Skipped { reason: String },
    Failed { error: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Succeeded { .. } => "succeeded",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }
}

/// Status of a single broker action within an account's pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    Done { order_id: Option<String> },
    Failed { error: String },
}

/// One broker action: an order placed or a batch of orders canceled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub symbol: String,
    pub description: String,
    pub status: ActionStatus,
}

impl ActionRecord {
    pub fn done(symbol: impl Into<String>, description: impl Into<String>, order_id: Option<String>) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            status: ActionStatus::Done { order_id },
        }
    }

    pub fn failed(symbol: impl Into<String>, description: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            status: ActionStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ActionStatus::Failed { .. })
    }

    pub fn order_id(&self) -> Option<&str> {
        match &self.status {
            ActionStatus::Done { order_id } => order_id.as_deref(),
            ActionStatus::Failed { .. } => None,
        }
    }
}

/// Read-only data fetched for view and balance operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountSnapshot {
    Balance(Balance),
    /// Positions, with resting orders used to show targets
    Positions {
        positions: Vec<Position>,
        orders: Vec<Order>,
    },
    /// Orders, with positions used to compute expected PnL
    Orders {
        orders: Vec<Order>,
        positions: Vec<Position>,
    },
}

/// Everything that happened on one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountResult {
    pub account: String,
    pub outcome: Outcome,
    pub plan: Option<PositionPlan>,
    pub snapshot: Option<AccountSnapshot>,
    pub actions: Vec<ActionRecord>,
    /// Non-fatal notices, e.g. wide entry deviation or clamped leverage
    pub warnings: Vec<String>,
}

impl AccountResult {
    fn new(account: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            account: account.into(),
            outcome,
            plan: None,
            snapshot: None,
            actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn succeeded(account: impl Into<String>, order_ids: Vec<String>) -> Self {
        Self::new(account, Outcome::Succeeded { order_ids })
    }

    pub fn skipped(account: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            account,
            Outcome::Skipped {
                reason: reason.into(),
            },
        )
    }

    pub fn failed(account: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            account,
            Outcome::Failed {
                error: error.into(),
            },
        )
    }

    /// Outcome derived from a list of actions: failed if any failed
    pub fn from_actions(account: impl Into<String>, actions: Vec<ActionRecord>) -> Self {
        let failures: Vec<String> = actions
            .iter()
            .filter_map(|a| match &a.status {
                ActionStatus::Failed { error } => Some(format!("{}: {}", a.symbol, error)),
                ActionStatus::Done { .. } => None,
            })
            .collect();

        let outcome = if failures.is_empty() {
            Outcome::Succeeded {
                order_ids: actions
                    .iter()
                    .filter_map(|a| a.order_id().map(str::to_string))
                    .collect(),
            }
        } else {
            Outcome::Failed {
                error: failures.join("; "),
            }
        };

        Self {
            actions,
            ..Self::new(account, outcome)
        }
    }

    pub fn with_plan(mut self, plan: PositionPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_snapshot(mut self, snapshot: AccountSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_actions(mut self, actions: Vec<ActionRecord>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Per-account results of one operation, in account configuration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub operation: String,
    pub results: Vec<AccountResult>,
}

impl BatchReport {
    pub fn new(operation: impl Into<String>, results: Vec<AccountResult>) -> Self {
        Self {
            operation: operation.into(),
            results,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_succeeded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    /// Every account failed
    pub fn is_total_failure(&self) -> bool {
        !self.results.is_empty() && self.failed() == self.results.len()
    }

    /// Some accounts failed, others did not
    pub fn is_partial_failure(&self) -> bool {
        let failed = self.failed();
        failed > 0 && failed < self.results.len()
    }

    pub fn result(&self, account: &str) -> Option<&AccountResult> {
        self.results.iter().find(|r| r.account == account)
    }
}
