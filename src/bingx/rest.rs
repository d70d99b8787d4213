//! REST API client for BingX perpetual swaps

use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::auth::{RequestSigner, API_KEY_HEADER};
use super::messages::*;
use crate::common::errors::{Result, TradingError};
use crate::common::traits::{single_position, BrokerConnection};
use crate::common::types::{
    Balance, Order, OrderAck, OrderFilter, OrderKind, OrderRequest, Position, PositionFilter,
    Side, WorkingType,
};
use crate::config::types::ApiCredentials;

/// Production endpoint
pub const LIVE_BASE_URL: &str = "https://open-api.bingx.com";
/// Demo (VST) endpoint
pub const DEMO_BASE_URL: &str = "https://open-api-vst.bingx.com";

const AUTH_ERROR_CODES: &[i64] = &[100001, 100004, 100412, 100413, 100419];
const BALANCE_ERROR_CODES: &[i64] = &[101204, 80012];
const SYMBOL_ERROR_CODES: &[i64] = &[109400, 80014];

/// REST API client for one BingX account
#[derive(Debug, Clone)]
pub struct BingxClient {
    /// HTTP client
    client: Client,
    /// Base URL, live or demo
    base_url: String,
    signer: RequestSigner,
}

impl BingxClient {
    /// Create a client for the live or demo environment
    pub fn new(credentials: ApiCredentials, demo: bool, timeout: Duration) -> Result<Self> {
        let base_url = if demo { DEMO_BASE_URL } else { LIVE_BASE_URL };
        Self::with_base_url(base_url, credentials, timeout)
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: &str, credentials: ApiCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TradingError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(credentials),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Send a signed request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Option<T>> {
        let query = self.signer.signed_query(&params)?;
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!("{} {}{}", method, self.base_url, path);

        let response = self
            .client
            .request(method, &url)
            .header(API_KEY_HEADER, self.signer.api_key())
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(path, %status, error = %e, "Failed to read error response body");
                    String::new()
                }
            };
            return Err(TradingError::InvalidResponse(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| transport_error(path, e))?;
        if envelope.code != 0 {
            return Err(api_error(envelope.code, envelope.msg));
        }

        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        self.send(method, path, params)
            .await?
            .ok_or_else(|| TradingError::InvalidResponse(format!("{} returned no data", path)))
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn fetch_balance(&self) -> Result<Balance> {
        let data: BalanceData = self
            .fetch(Method::GET, "/openApi/swap/v2/user/balance", Vec::new())
            .await?;
        convert_balance(data.balance)
    }

    #[instrument(skip(self))]
    pub async fn fetch_price(&self, symbol: &str) -> Result<Decimal> {
        let data: PriceData = self
            .fetch(
                Method::GET,
                "/openApi/swap/v2/quote/price",
                vec![param("symbol", symbol)],
            )
            .await?;
        parse_decimal("price", &data.price)
    }

    #[instrument(skip(self))]
    pub async fn fetch_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>> {
        let params = symbol.map(|s| vec![param("symbol", s)]).unwrap_or_default();
        let data: Vec<PositionData> = self
            .send(Method::GET, "/openApi/swap/v2/user/positions", params)
            .await?
            .unwrap_or_default();

        let mut positions = Vec::with_capacity(data.len());
        for raw in data {
            if let Some(position) = convert_position(raw)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    #[instrument(skip(self))]
    pub async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let params = symbol.map(|s| vec![param("symbol", s)]).unwrap_or_default();
        let data: OpenOrdersData = self
            .send(Method::GET, "/openApi/swap/v2/trade/openOrders", params)
            .await?
            .unwrap_or(OpenOrdersData { orders: Vec::new() });

        let mut orders = Vec::with_capacity(data.orders.len());
        for raw in data.orders {
            match convert_order(raw)? {
                Some(order) => orders.push(order),
                None => continue,
            }
        }
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn update_leverage(&self, symbol: &str, side: Side, leverage: u32) -> Result<()> {
        self.send::<serde_json::Value>(
            Method::POST,
            "/openApi/swap/v2/trade/leverage",
            vec![
                param("symbol", symbol),
                param("side", side),
                param("leverage", leverage),
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol, kind = %request.kind))]
    pub async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let params = order_params(request)?;
        let data: PlaceOrderData = self
            .fetch(Method::POST, "/openApi/swap/v2/trade/order", params)
            .await?;

        Ok(OrderAck {
            order_id: data.order.order_id,
            symbol: if data.order.symbol.is_empty() {
                request.symbol.clone()
            } else {
                data.order.symbol
            },
            status: data.order.status,
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel_open_orders(&self, symbol: &str) -> Result<()> {
        self.send::<serde_json::Value>(
            Method::DELETE,
            "/openApi/swap/v2/trade/allOpenOrders",
            vec![param("symbol", symbol)],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BrokerConnection for BingxClient {
    fn broker_name(&self) -> &'static str {
        "bingx"
    }

    async fn get_balance(&self) -> Result<Balance> {
        self.fetch_balance().await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal> {
        self.fetch_price(symbol).await
    }

    async fn get_positions(&self, filter: &PositionFilter) -> Result<Vec<Position>> {
        self.fetch_positions(filter.symbol.as_deref()).await
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let positions = self.fetch_positions(Some(symbol)).await?;
        single_position(symbol, positions)
    }

    async fn get_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.fetch_open_orders(filter.symbol.as_deref()).await
    }

    async fn set_leverage(&self, symbol: &str, side: Side, leverage: u32) -> Result<()> {
        self.update_leverage(symbol, side, leverage).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        self.submit_order(request).await
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        self.cancel_open_orders(symbol).await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn transport_error(path: &str, e: reqwest::Error) -> TradingError {
    if e.is_timeout() {
        TradingError::Timeout(path.to_string())
    } else {
        TradingError::HttpRequest(e)
    }
}

/// Map a non-zero envelope code to a typed error
pub fn api_error(code: i64, msg: String) -> TradingError {
    let lower = msg.to_lowercase();
    if AUTH_ERROR_CODES.contains(&code) || lower.contains("signature") || lower.contains("apikey") {
        TradingError::Authentication(msg)
    } else if BALANCE_ERROR_CODES.contains(&code) || lower.contains("insufficient") {
        TradingError::InsufficientBalance(msg)
    } else if SYMBOL_ERROR_CODES.contains(&code)
        || (lower.contains("symbol") && (lower.contains("not exist") || lower.contains("invalid")))
    {
        TradingError::InvalidSymbol(msg)
    } else {
        TradingError::Api { code, message: msg }
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    value
        .parse()
        .map_err(|e| TradingError::InvalidResponse(format!("Invalid {}: {} ({})", field, value, e)))
}

/// Missing leverage reads as 1x; anything else must be a whole number
fn parse_leverage(value: &str) -> Result<u32> {
    if value.is_empty() {
        return Ok(1);
    }
    value
        .parse()
        .map_err(|e| TradingError::InvalidResponse(format!("Invalid leverage: {} ({})", value, e)))
}

/// Wire text for a decimal: at most 8 places, no trailing zeros
fn format_decimal(value: Decimal) -> String {
    value.round_dp(8).normalize().to_string()
}

fn json_number(value: Decimal) -> serde_json::Value {
    let text = format_decimal(value);
    match text.parse::<serde_json::Number>() {
        Ok(n) => serde_json::Value::Number(n),
        Err(_) => serde_json::Value::String(text),
    }
}

fn wire_side(side: Side) -> &'static str {
    match side {
        Side::Long => "BUY",
        Side::Short => "SELL",
    }
}

fn working_type(working: WorkingType) -> &'static str {
    match working {
        WorkingType::MarkPrice => "MARK_PRICE",
        WorkingType::ContractPrice => "CONTRACT_PRICE",
    }
}

fn wire_order_type(request: &OrderRequest) -> &'static str {
    match request.kind {
        OrderKind::Limit => "LIMIT",
        OrderKind::Market => "MARKET",
        OrderKind::Stop if request.price.is_some() => "STOP",
        OrderKind::Stop => "STOP_MARKET",
        OrderKind::TakeProfit if request.price.is_some() => "TAKE_PROFIT",
        OrderKind::TakeProfit => "TAKE_PROFIT_MARKET",
        OrderKind::TrailingStop => "TRAILING_STOP_MARKET",
    }
}

/// Query parameters for an order request
///
/// In hedge mode the position side is the side being opened, or for
/// reduce-only orders the side being closed.
pub fn order_params(request: &OrderRequest) -> Result<Vec<(String, String)>> {
    let position_side = if request.reduce_only {
        request.side.opposite()
    } else {
        request.side
    };

    let mut params = vec![
        param("symbol", &request.symbol),
        param("side", wire_side(request.side)),
        param("positionSide", position_side),
        param("type", wire_order_type(request)),
        param("quantity", format_decimal(request.size)),
    ];

    if let Some(price) = request.price {
        params.push(param("price", format_decimal(price)));
    }
    if let Some(stop_price) = request.stop_price {
        params.push(param("stopPrice", format_decimal(stop_price)));
    }

    if let Some(sl) = &request.stop_loss {
        let leg = ConditionalLeg {
            order_type: if sl.order_price.is_zero() { "STOP_MARKET" } else { "STOP" },
            stop_price: json_number(sl.trigger_price),
            price: json_number(sl.order_price),
            working_type: working_type(sl.working_type),
        };
        params.push(param("stopLoss", serde_json::to_string(&leg)?));
    }

    if let Some(tp) = &request.take_profit {
        let leg = ConditionalLeg {
            order_type: if tp.order_price.is_zero() {
                "TAKE_PROFIT_MARKET"
            } else {
                "TAKE_PROFIT"
            },
            stop_price: json_number(tp.trigger_price),
            price: json_number(tp.order_price),
            working_type: working_type(tp.working_type),
        };
        params.push(param("takeProfit", serde_json::to_string(&leg)?));
    }

    if let Some(trailing) = &request.trailing {
        params.push(param("activationPrice", format_decimal(trailing.activation_price)));
        params.push(param("priceRate", format_decimal(trailing.callback_rate)));
    }

    Ok(params)
}

fn convert_balance(raw: BalanceDetail) -> Result<Balance> {
    Ok(Balance {
        asset: raw.asset,
        total: parse_decimal("balance", &raw.balance)?,
        available: parse_decimal("availableMargin", &raw.available_margin)?,
        in_use: parse_decimal("usedMargin", &raw.used_margin)?,
        unrealized_pnl: parse_decimal("unrealizedProfit", &raw.unrealized_profit)?,
    })
}

/// Zero-size entries are dropped
fn convert_position(raw: PositionData) -> Result<Option<Position>> {
    let amount = parse_decimal("positionAmt", &raw.position_amt)?;
    if amount.is_zero() {
        return Ok(None);
    }

    let side = match raw.position_side.as_str() {
        "LONG" => Side::Long,
        "SHORT" => Side::Short,
        _ if amount.is_sign_negative() => Side::Short,
        _ => Side::Long,
    };

    let entry_price = parse_decimal("avgPrice", &raw.avg_price)?;
    let mark_price = match parse_decimal("markPrice", &raw.mark_price)? {
        p if p.is_zero() => entry_price,
        p => p,
    };

    Ok(Some(Position {
        symbol: raw.symbol,
        side,
        size: amount.abs(),
        entry_price,
        mark_price,
        unrealized_pnl: parse_decimal("unrealizedProfit", &raw.unrealized_profit)?,
        leverage: parse_leverage(&raw.leverage)?,
    }))
}

/// Unknown order types are skipped
fn convert_order(raw: OrderData) -> Result<Option<Order>> {
    let kind = match raw.order_type.as_str() {
        "LIMIT" => OrderKind::Limit,
        "MARKET" => OrderKind::Market,
        "STOP" | "STOP_MARKET" => OrderKind::Stop,
        "TAKE_PROFIT" | "TAKE_PROFIT_MARKET" => OrderKind::TakeProfit,
        "TRAILING_STOP_MARKET" | "TRAILING_TP_SL" => OrderKind::TrailingStop,
        other => {
            warn!(order_id = %raw.order_id, order_type = other, "Skipping unsupported order type");
            return Ok(None);
        }
    };

    let side = match raw.side.as_str() {
        "BUY" => Side::Long,
        "SELL" => Side::Short,
        other => {
            return Err(TradingError::InvalidResponse(format!(
                "Invalid order side: {}",
                other
            )))
        }
    };

    // BUY against a SHORT position side closes it, and vice versa
    let closes = match raw.position_side.as_str() {
        "LONG" => side == Side::Short,
        "SHORT" => side == Side::Long,
        _ => false,
    };

    Ok(Some(Order {
        id: raw.order_id,
        symbol: raw.symbol,
        side,
        kind,
        size: parse_decimal("origQty", &raw.orig_qty)?,
        price: parse_decimal("price", &raw.price)?,
        stop_price: parse_decimal("stopPrice", &raw.stop_price)?,
        reduce_only: raw.reduce_only.unwrap_or(closes),
    }))
}
