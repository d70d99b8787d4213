use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::common::types::{EntryKind, Side};
use crate::intent::types::{IntentKind, NormalizedCommand, RawIntent};
use crate::strategy::RiskCalculator;

/// Largest trailing callback accepted, in percent
const MAX_CALLBACK_PERCENT: Decimal = dec!(5);

/// Turns raw intents into classified [`NormalizedCommand`]s
///
/// Never fails: problems are recorded on the command as missing fields or
/// semantic errors, and the caller decides whether to report or re-prompt.
#[derive(Debug, Clone)]
pub struct CommandNormalizer {
    quote_asset: String,
}

impl CommandNormalizer {
    pub fn new(quote_asset: impl Into<String>) -> Self {
        Self {
            quote_asset: quote_asset.into().trim().to_uppercase(),
        }
    }

    pub fn normalize(&self, raw: &RawIntent) -> NormalizedCommand {
        let mut cmd = NormalizedCommand {
            intent: raw.kind,
            symbol: raw.symbol.as_deref().and_then(|s| self.normalize_symbol(s)),
            side: raw.side.as_deref().and_then(|s| s.parse::<Side>().ok()),
            entry_price: raw.entry_price,
            stop_loss: raw.stop_loss,
            take_profit: raw.take_profit,
            risk_percent: raw.risk_percent,
            rr_ratio: raw.rr_ratio,
            trigger_price: raw.trigger_price,
            callback_rate: raw.callback_rate,
            close_percentage: raw.close_percentage,
            entry_kind: if raw.market {
                EntryKind::Market
            } else {
                EntryKind::Limit
            },
            missing: Vec::new(),
            errors: Vec::new(),
        };

        match cmd.intent {
            IntentKind::Open => check_open(&mut cmd),
            IntentKind::Close => check_close(&mut cmd),
            IntentKind::TrailingStop => check_trailing(&mut cmd),
            IntentKind::BreakEven => require(&mut cmd, "symbol", |c| c.symbol.is_some()),
            IntentKind::ViewPositions
            | IntentKind::ViewOrders
            | IntentKind::Cancel
            | IntentKind::CheckBalance => {}
        }

        if !cmd.is_valid() {
            debug!(
                intent = %cmd.intent,
                missing = ?cmd.missing,
                errors = ?cmd.errors,
                "Command rejected by normalizer"
            );
        }

        cmd
    }

    /// Upper-case and qualify a symbol with the quote asset
    ///
    /// `eth` → `ETH-USDT`, `ETHUSDT` → `ETH-USDT`, `eth/usdt` → `ETH-USDT`.
    /// Blank input, a bare quote asset, or a pair with an empty side yields `None`.
    pub fn normalize_symbol(&self, symbol: &str) -> Option<String> {
        let symbol = symbol.trim().to_uppercase().replace('/', "-");
        if symbol.is_empty() || symbol == self.quote_asset {
            return None;
        }
        if let Some((base, quote)) = symbol.split_once('-') {
            if base.is_empty() || quote.is_empty() || quote.contains('-') {
                return None;
            }
            return Some(symbol);
        }

        match symbol.strip_suffix(self.quote_asset.as_str()) {
            Some(base) if !base.is_empty() => Some(format!("{}-{}", base, self.quote_asset)),
            _ => Some(format!("{}-{}", symbol, self.quote_asset)),
        }
    }
}

impl Default for CommandNormalizer {
    fn default() -> Self {
        Self::new("USDT")
    }
}

fn require(cmd: &mut NormalizedCommand, field: &str, present: impl Fn(&NormalizedCommand) -> bool) {
    if !present(cmd) {
        cmd.missing.push(field.to_string());
    }
}

fn non_positive(label: &str, value: Option<Decimal>) -> Option<String> {
    value
        .filter(|v| *v <= Decimal::ZERO)
        .map(|v| format!("{} must be positive, got {}", label, v))
}

fn check_open(cmd: &mut NormalizedCommand) {
    require(cmd, "symbol", |c| c.symbol.is_some());
    require(cmd, "side", |c| c.side.is_some());
    require(cmd, "entry_price", |c| c.entry_price.is_some());
    require(cmd, "stop_loss", |c| c.stop_loss.is_some());
    require(cmd, "risk_percent", |c| c.risk_percent.is_some());

    let prices = [
        ("entry price", cmd.entry_price),
        ("stop loss", cmd.stop_loss),
        ("take profit", cmd.take_profit),
        ("risk/reward ratio", cmd.rr_ratio),
    ];
    cmd.errors
        .extend(prices.into_iter().filter_map(|(label, v)| non_positive(label, v)));

    // Cross-field checks need every required field
    if !cmd.missing.is_empty() {
        return;
    }
    let (Some(side), Some(entry), Some(stop), Some(risk)) =
        (cmd.side, cmd.entry_price, cmd.stop_loss, cmd.risk_percent)
    else {
        return;
    };

    if let Err(e) = RiskCalculator::validate_price_logic(side, entry, stop) {
        cmd.errors.push(e.to_string());
    }

    if let Some(tp) = cmd.take_profit {
        if !RiskCalculator::take_profit_in_profit(side, entry, tp) {
            let relation = match side {
                Side::Long => "above",
                Side::Short => "below",
            };
            cmd.errors.push(format!(
                "take profit must be {} entry price for {} positions",
                relation, side
            ));
        }
    }

    if risk <= Decimal::ZERO || risk > dec!(100) {
        cmd.errors.push(format!(
            "risk percent must be greater than 0 and at most 100, got {}",
            risk
        ));
    }
}

fn check_close(cmd: &mut NormalizedCommand) {
    if let Some(p) = cmd.close_percentage {
        if p < Decimal::ZERO || p > dec!(100) {
            cmd.errors
                .push(format!("close percentage must be between 0 and 100, got {}", p));
        }
    }
}

fn check_trailing(cmd: &mut NormalizedCommand) {
    require(cmd, "symbol", |c| c.symbol.is_some());
    require(cmd, "trigger_price", |c| c.trigger_price.is_some());
    require(cmd, "callback_rate", |c| c.callback_rate.is_some());

    if let Some(e) = non_positive("trigger price", cmd.trigger_price) {
        cmd.errors.push(e);
    }

    if let Some(rate) = cmd.callback_rate {
        if rate <= Decimal::ZERO || rate > MAX_CALLBACK_PERCENT {
            cmd.errors.push(format!(
                "callback rate must be greater than 0 and at most {}%, got {}",
                MAX_CALLBACK_PERCENT, rate
            ));
        }
    }
}
