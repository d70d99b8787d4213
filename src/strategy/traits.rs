use crate::common::errors::Result;
use crate::strategy::types::{PositionParams, PositionPlan};

/// Core planning strategy trait
///
/// A strategy turns validated trade parameters plus the account's live balance
/// into a complete [`PositionPlan`]. Strategies must stay synchronous and free of
/// I/O: everything they need is in [`PositionParams`].
///
/// # Example
///
/// ```ignore
/// struct FixedSizeStrategy {
///     size: Decimal,
/// }
///
/// impl PlanningStrategy for FixedSizeStrategy {
///     fn name(&self) -> &str { "fixed_size" }
///
///     fn calculate_position(&self, params: &PositionParams) -> Result<PositionPlan> {
///         // Same stop and target handling, constant size
///         todo!()
///     }
/// }
/// ```
pub trait PlanningStrategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &str;

    /// Compute the full plan for one account
    ///
    /// # Errors
    /// * `StopLossPlacement` - stop on the wrong side of entry
    /// * `InvalidInput` - sizing inputs the math cannot use
    /// * `LeverageExceedsMax` - required leverage above the cap under the abort policy
    fn calculate_position(&self, params: &PositionParams) -> Result<PositionPlan>;
}

/// Boxed strategy for dynamic dispatch
pub type BoxedPlanningStrategy = Box<dyn PlanningStrategy>;
