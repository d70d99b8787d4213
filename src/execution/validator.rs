use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::errors::{Result, TradingError};
use crate::common::types::{EntryKind, Side};

/// Check an entry against the live market before planning
///
/// A LIMIT entry on the wrong side of the market (LONG above current price,
/// SHORT below) would fill instantly as a taker and is rejected. Market
/// entries skip that check. An entry further than `warn_percent` from the
/// current price is allowed and reported as a warning.
pub fn validate_against_market(
    side: Side,
    entry: Decimal,
    current_price: Decimal,
    entry_kind: EntryKind,
    warn_percent: Decimal,
) -> Result<Vec<String>> {
    if current_price <= Decimal::ZERO {
        return Err(TradingError::InvalidResponse(format!(
            "current price must be positive, got {}",
            current_price
        )));
    }

    if entry_kind == EntryKind::Limit {
        let crosses = match side {
            Side::Long => entry > current_price,
            Side::Short => entry < current_price,
        };
        if crosses {
            return Err(TradingError::WouldExecuteImmediately {
                side,
                entry,
                current_price,
            });
        }
    }

    let deviation = (entry - current_price) / current_price * dec!(100);
    let mut warnings = Vec::new();
    if deviation.abs() > warn_percent {
        warnings.push(format!(
            "entry price {} is {}% away from current price {}",
            entry,
            deviation.round_dp(2),
            current_price
        ));
    }

    Ok(warnings)
}
