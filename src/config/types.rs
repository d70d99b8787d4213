//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Trading accounts, in display order
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
    /// Natural-language processing configuration
    #[serde(default)]
    pub nlp: NlpConfig,
}

impl AppConfig {
    /// Only the accounts flagged as enabled, in configuration order
    pub fn enabled_accounts(&self) -> Vec<&Account> {
        self.accounts.iter().filter(|a| a.enabled).collect()
    }
}

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    Bingx,
}

impl std::fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerKind::Bingx => write!(f, "bingx"),
        }
    }
}

/// A trading account as read from configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique display name
    pub name: String,
    /// API key
    #[serde(default)]
    pub api_key: String,
    /// API secret
    #[serde(default)]
    pub secret_key: String,
    /// Exchange this account lives on
    pub broker: BrokerKind,
    /// Use the exchange's demo/testnet environment
    #[serde(default)]
    pub demo: bool,
    /// Include this account in batch operations
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Account {
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials::new(self.api_key.clone(), self.secret_key.clone())
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("broker", &self.broker)
            .field("demo", &self.demo)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

fn default_enabled() -> bool {
    true
}

/// What to do when the required leverage exceeds the configured cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeveragePolicy {
    /// Use the cap and shrink nothing; the position simply needs more margin
    Clamp,
    /// Refuse to open the position
    Abort,
}

impl Default for LeveragePolicy {
    fn default() -> Self {
        Self::Clamp
    }
}

/// One scale-out target expressed as a risk/reward multiple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitLevel {
    pub rr_ratio: Decimal,
    /// Share of the position closed at this level, 0 < fraction <= 1
    pub fraction: Decimal,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Leverage cap applied by the planner
    #[serde(default = "default_max_leverage")]
    pub max_leverage: u32,
    /// Clamp or abort when the cap is exceeded
    #[serde(default)]
    pub leverage_policy: LeveragePolicy,
    /// Risk/reward ratio used when a command gives neither ratio nor take profit
    #[serde(default = "default_rr_ratio")]
    pub default_rr_ratio: Decimal,
    /// Entry-vs-market deviation (percent) above which a warning is raised
    #[serde(default = "default_price_deviation_warn")]
    pub price_deviation_warn_percent: Decimal,
    /// Accounts processed in parallel
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Quote asset appended to bare symbols ("ETH" -> "ETH-USDT")
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Watch-mode refresh interval in seconds
    #[serde(default = "default_watch_refresh")]
    pub watch_refresh_seconds: u64,
    /// Multi-level take profits; empty means a single target
    #[serde(default)]
    pub take_profit_levels: Vec<TakeProfitLevel>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_leverage: default_max_leverage(),
            leverage_policy: LeveragePolicy::default(),
            default_rr_ratio: default_rr_ratio(),
            price_deviation_warn_percent: default_price_deviation_warn(),
            max_concurrency: default_max_concurrency(),
            request_timeout_seconds: default_request_timeout(),
            quote_asset: default_quote_asset(),
            watch_refresh_seconds: default_watch_refresh(),
            take_profit_levels: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_leverage() -> u32 {
    125
}

fn default_rr_ratio() -> Decimal {
    dec!(2)
}

fn default_price_deviation_warn() -> Decimal {
    dec!(5)
}

fn default_max_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_watch_refresh() -> u64 {
    30
}

/// Wit.ai configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    /// Server access token; falls back to WIT_AI_TOKEN
    #[serde(default)]
    pub wit_token: Option<String>,
    /// Base URL for the Wit.ai HTTP API
    #[serde(default = "default_wit_url")]
    pub wit_url: String,
    /// API version date sent with every request
    #[serde(default = "default_wit_version")]
    pub api_version: String,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            wit_token: None,
            wit_url: default_wit_url(),
            api_version: default_wit_version(),
        }
    }
}

fn default_wit_url() -> String {
    "https://api.wit.ai".to_string()
}

fn default_wit_version() -> String {
    "20240304".to_string()
}

/// API credentials for authenticated requests
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = ApiCredentials::new("key".to_string(), "very-secret".to_string());
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("key"));
        assert!(!rendered.contains("very-secret"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.max_leverage, 125);
        assert_eq!(settings.default_rr_ratio, dec!(2));
        assert_eq!(settings.leverage_policy, LeveragePolicy::Clamp);
        assert!(settings.take_profit_levels.is_empty());
    }
}
