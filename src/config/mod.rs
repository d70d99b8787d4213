//! Configuration module

pub mod loader;
pub mod types;

pub use loader::{load_config, load_config_from_str, validate, DEFAULT_CONFIG_PATH};
pub use types::{
    Account, ApiCredentials, AppConfig, AppSettings, BrokerKind, LeveragePolicy, NlpConfig,
    TakeProfitLevel,
};
