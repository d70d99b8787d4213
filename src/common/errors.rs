//! Error types for the application

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::Side;

/// Result type alias using our TradingError
pub type Result<T> = std::result::Result<T, TradingError>;

/// Main error type for planning, validation and broker operations
#[derive(Error, Debug)]
pub enum TradingError {
    /// Numeric input the planner cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A command that failed normalization
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Stop loss on the wrong side of entry
    #[error("stop loss must be {} entry price for {side} positions", stop_loss_relation(.side))]
    StopLossPlacement { side: Side },

    /// A limit entry the exchange would fill instantly as a market order
    #[error("{side} limit entry {entry} would execute immediately against current price {current_price}")]
    WouldExecuteImmediately {
        side: Side,
        entry: Decimal,
        current_price: Decimal,
    },

    /// Required leverage above the configured cap when the policy is to abort
    #[error("required leverage {required}x exceeds maximum {max}x")]
    LeverageExceedsMax { required: u32, max: u32 },

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Not enough margin to place the order
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Symbol unknown to the exchange
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Error code returned by the exchange API
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Hedge-mode account holding both sides of one symbol
    #[error("both long and short positions are open on {0}")]
    AmbiguousPosition(String),

    /// Nothing to fan out to
    #[error("no accounts enabled")]
    NoAccountsEnabled,

    /// Scope names an account that is not configured or not enabled
    #[error("account not found or not enabled: {0}")]
    AccountNotFound(String),

    /// Natural-language processing failures
    #[error("NLP error: {0}")]
    Nlp(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn stop_loss_relation(side: &Side) -> &'static str {
    match side {
        Side::Long => "below",
        Side::Short => "above",
    }
}

impl TradingError {
    /// Whether this error comes from local input checks rather than the network
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TradingError::InvalidInput(_)
                | TradingError::Validation(_)
                | TradingError::StopLossPlacement { .. }
                | TradingError::WouldExecuteImmediately { .. }
                | TradingError::LeverageExceedsMax { .. }
        )
    }
}
