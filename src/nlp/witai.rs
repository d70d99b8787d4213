//! Wit.ai HTTP client
//!
//! Wit.ai classifies the utterance into an intent and tags entities with a
//! role (`symbol`, `entry`, `stop_loss`, ...). Entities are keyed as
//! `"<entity>:<role>"`, e.g. `"wit$number:entry"`.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::NlpProcessor;
use crate::common::errors::{Result, TradingError};
use crate::config::types::NlpConfig;
use crate::intent::{CommandNormalizer, IntentKind, ParsedCommand, RawIntent};

/// `GET /message` response
#[derive(Debug, Clone, Deserialize)]
pub struct WitResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub intents: Vec<WitIntent>,
    #[serde(default)]
    pub entities: HashMap<String, Vec<WitEntity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WitIntent {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WitEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl WitEntity {
    fn text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ if !self.body.trim().is_empty() => Some(self.body.trim().to_string()),
            _ => None,
        }
    }

    /// Numeric value, tolerating `"2%"`, `"3,950"` and exponent notation
    fn decimal(&self) -> Option<Decimal> {
        let text = self.text()?;
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '%' | ',' | '$' | ' '))
            .collect();
        Decimal::from_str(&cleaned)
            .or_else(|_| Decimal::from_scientific(&cleaned))
            .ok()
    }
}

/// [`NlpProcessor`] backed by Wit.ai
#[derive(Debug, Clone)]
pub struct WitAiProcessor {
    client: Client,
    base_url: String,
    token: String,
    api_version: String,
    normalizer: CommandNormalizer,
}

impl WitAiProcessor {
    pub fn new(config: &NlpConfig, normalizer: CommandNormalizer, timeout: Duration) -> Result<Self> {
        let token = config
            .wit_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                TradingError::Configuration(
                    "Wit.ai token not set (nlp.wit_token or WIT_AI_TOKEN)".to_string(),
                )
            })?
            .to_string();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TradingError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.wit_url.trim_end_matches('/').to_string(),
            token,
            api_version: config.api_version.clone(),
            normalizer,
        })
    }

    async fn message(&self, text: &str) -> Result<WitResponse> {
        let url = format!("{}/message", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("v", self.api_version.as_str()), ("q", text)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TradingError::Timeout("Wit.ai request timed out".to_string())
                } else {
                    TradingError::HttpRequest(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TradingError::Authentication(format!(
                "Wit.ai rejected the token ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::Nlp(format!(
                "Wit.ai returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NlpProcessor for WitAiProcessor {
    fn provider(&self) -> &'static str {
        "wit.ai"
    }

    #[instrument(skip(self))]
    async fn parse_command(&self, text: &str) -> Result<ParsedCommand> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TradingError::InvalidInput("empty command".to_string()));
        }

        let response = self.message(text).await?;
        let (raw, confidence) = raw_intent_from(&response)?;
        debug!(intent = %raw.kind, confidence, "Wit.ai classified command");

        Ok(ParsedCommand {
            command: self.normalizer.normalize(&raw),
            confidence,
        })
    }
}

/// Build a raw intent from the best-scoring intent and its entities
pub fn raw_intent_from(response: &WitResponse) -> Result<(RawIntent, f64)> {
    let top = response
        .intents
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .ok_or_else(|| TradingError::Nlp(format!("could not understand: {}", response.text)))?;

    let kind = IntentKind::from_str(&top.name)
        .map_err(|_| TradingError::Nlp(format!("unsupported intent: {}", top.name)))?;

    let mut raw = RawIntent::new(kind);
    for (key, entities) in &response.entities {
        let Some(entity) = entities
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        else {
            continue;
        };

        let role = if entity.role.is_empty() {
            key.rsplit(':').next().unwrap_or(key.as_str())
        } else {
            entity.role.as_str()
        };

        match role {
            "symbol" => raw.symbol = entity.text(),
            "side" => raw.side = entity.text(),
            "entry" => raw.entry_price = entity.decimal(),
            "stop_loss" => raw.stop_loss = entity.decimal(),
            "take_profit" => raw.take_profit = entity.decimal(),
            "risk" => raw.risk_percent = entity.decimal(),
            "rr" => raw.rr_ratio = entity.decimal(),
            "trigger" => raw.trigger_price = entity.decimal(),
            "callback" => raw.callback_rate = entity.decimal(),
            "percentage" => raw.close_percentage = entity.decimal(),
            "market" => raw.market = true,
            other => debug!(role = other, "Ignoring unknown entity role"),
        }
    }

    Ok((raw, top.confidence))
}
