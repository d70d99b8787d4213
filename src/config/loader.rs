//! Configuration loader

use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, TradingError};

/// Default location of the accounts file
pub const DEFAULT_CONFIG_PATH: &str = "configs/accounts.yaml";

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with TRADING__)
/// 2. Configuration file (YAML or TOML, chosen by extension)
/// 3. Default values
pub fn load_config(config_path: &str) -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    if !Path::new(config_path).exists() {
        return Err(TradingError::Configuration(format!(
            "config file not found: {}",
            config_path
        )));
    }

    let builder = Config::builder()
        .add_source(File::with_name(config_path))
        .add_source(
            Environment::with_prefix("TRADING")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

/// Load configuration from an in-memory document
pub fn load_config_from_str(content: &str, format: FileFormat) -> Result<AppConfig> {
    let builder = Config::builder().add_source(File::from_str(content, format));
    finish(builder)
}

fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<AppConfig> {
    let config = builder
        .build()
        .map_err(|e| TradingError::Configuration(e.to_string()))?;

    let mut app: AppConfig = config
        .try_deserialize()
        .map_err(|e| TradingError::Configuration(e.to_string()))?;

    if app.nlp.wit_token.is_none() {
        app.nlp.wit_token = std::env::var("WIT_AI_TOKEN").ok().filter(|t| !t.is_empty());
    }

    validate(&app)?;
    Ok(app)
}

/// Check that the configuration is usable
pub fn validate(config: &AppConfig) -> Result<()> {
    if config.accounts.is_empty() {
        return Err(TradingError::Configuration(
            "no accounts configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for (i, account) in config.accounts.iter().enumerate() {
        let fail = |msg: &str| {
            TradingError::Configuration(format!("account {} ({}): {}", i, account.name, msg))
        };

        if account.name.trim().is_empty() {
            return Err(fail("account name is required"));
        }
        if account.api_key.is_empty() {
            return Err(fail("api_key is required"));
        }
        if account.secret_key.is_empty() {
            return Err(fail("secret_key is required"));
        }
        if !names.insert(account.name.as_str()) {
            return Err(fail("duplicate account name"));
        }
    }

    let settings = &config.settings;
    if settings.max_leverage == 0 {
        return Err(TradingError::Configuration(
            "max_leverage must be at least 1".to_string(),
        ));
    }
    if settings.max_concurrency == 0 {
        return Err(TradingError::Configuration(
            "max_concurrency must be at least 1".to_string(),
        ));
    }
    if settings.default_rr_ratio <= Decimal::ZERO {
        return Err(TradingError::Configuration(
            "default_rr_ratio must be positive".to_string(),
        ));
    }

    let mut total = Decimal::ZERO;
    for level in &settings.take_profit_levels {
        if level.rr_ratio <= Decimal::ZERO {
            return Err(TradingError::Configuration(
                "take profit rr_ratio must be positive".to_string(),
            ));
        }
        if level.fraction <= Decimal::ZERO || level.fraction > Decimal::ONE {
            return Err(TradingError::Configuration(
                "take profit fraction must be in (0, 1]".to_string(),
            ));
        }
        total += level.fraction;
    }
    if total > Decimal::ONE {
        return Err(TradingError::Configuration(format!(
            "take profit fractions sum to {}, must not exceed 1",
            total
        )));
    }

    Ok(())
}
