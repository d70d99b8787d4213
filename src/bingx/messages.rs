//! BingX perpetual swap wire types
//!
//! Numeric fields arrive as strings on some endpoints and as numbers on
//! others, so they are kept as text here and parsed to `Decimal` on conversion.

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope wrapping every BingX response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Accept `"1.5"`, `1.5` or `null` and keep the textual form
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceData {
    pub balance: BalanceDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetail {
    #[serde(default)]
    pub asset: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub balance: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub equity: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unrealized_profit: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub available_margin: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub used_margin: String,
}

// ============================================================================
// Market
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PriceData {
    #[serde(default)]
    pub symbol: String,
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
}

// ============================================================================
// Positions & orders
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub symbol: String,
    /// LONG, SHORT, or BOTH in one-way mode
    #[serde(default)]
    pub position_side: String,
    #[serde(deserialize_with = "string_or_number")]
    pub position_amt: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub avg_price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub mark_price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unrealized_profit: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub leverage: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersData {
    #[serde(default)]
    pub orders: Vec<OrderData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub symbol: String,
    #[serde(deserialize_with = "string_or_number")]
    pub order_id: String,
    /// BUY or SELL
    pub side: String,
    #[serde(default)]
    pub position_side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub orig_qty: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub stop_price: String,
    #[serde(default)]
    pub reduce_only: Option<bool>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderData {
    pub order: PlacedOrder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    #[serde(deserialize_with = "string_or_number")]
    pub order_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}

/// Attached stop-loss / take-profit leg, sent JSON-encoded as a query value
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalLeg {
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub stop_price: serde_json::Value,
    pub price: serde_json::Value,
    pub working_type: &'static str,
}
