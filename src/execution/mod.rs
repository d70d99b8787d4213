//! Execution layer
//!
//! Turns validated commands into broker calls across accounts:
//!
//! ```text
//! NormalizedCommand -> Operation -> Orchestrator
//!                                     ├─ account A: validate -> plan -> orders
//!                                     ├─ account B: ...
//!                                     └─ BatchReport (config order)
//! ```

pub mod operation;
pub mod orchestrator;
pub mod order_builder;
pub mod report;
pub mod session;
pub mod validator;

pub use operation::{AccountScope, OpenRequest, Operation};
pub use orchestrator::Orchestrator;
pub use order_builder::{close_size, OrderBuilder};
pub use report::{AccountResult, AccountSnapshot, ActionRecord, ActionStatus, BatchReport, Outcome};
pub use session::{build_sessions, AccountSession};
pub use validator::validate_against_market;
