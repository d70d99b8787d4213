//! Process-wide wiring of configuration, normalizer and orchestrator

use std::time::Duration;
use tracing::info;

use crate::common::errors::Result;
use crate::config::types::AppConfig;
use crate::execution::{build_sessions, AccountScope, AccountSession, BatchReport, Operation, Orchestrator};
use crate::intent::{CommandNormalizer, NormalizedCommand, RawIntent};
use crate::nlp::{BoxedNlpProcessor, WitAiProcessor};
use crate::strategy::RiskRatioStrategy;

/// Everything a command needs to run
pub struct TradingContext {
    config: AppConfig,
    normalizer: CommandNormalizer,
    orchestrator: Orchestrator,
}

impl TradingContext {
    /// Connect every enabled account from `config`
    pub fn connect(config: AppConfig, force_demo: bool) -> Result<Self> {
        let sessions = build_sessions(&config, force_demo)?;
        Ok(Self::with_sessions(config, sessions))
    }

    /// Build around pre-made sessions
    pub fn with_sessions(config: AppConfig, sessions: Vec<AccountSession>) -> Self {
        let settings = config.settings.clone();
        let strategy = RiskRatioStrategy::new(settings.default_rr_ratio)
            .with_levels(settings.take_profit_levels.clone());

        info!(
            accounts = sessions.len(),
            strategy = "riskratio",
            "Trading context ready"
        );

        Self {
            normalizer: CommandNormalizer::new(settings.quote_asset.clone()),
            orchestrator: Orchestrator::new(sessions, settings, Box::new(strategy)),
            config,
        }
    }

    pub fn normalize(&self, raw: &RawIntent) -> NormalizedCommand {
        self.normalizer.normalize(raw)
    }

    /// Run a classified command; invalid commands fail with `Validation`
    pub async fn run(&self, command: &NormalizedCommand, scope: &AccountScope) -> Result<BatchReport> {
        let operation = Operation::try_from(command)?;
        self.orchestrator.execute(&operation, scope).await
    }

    /// Normalize then run
    pub async fn run_raw(&self, raw: &RawIntent, scope: &AccountScope) -> Result<BatchReport> {
        self.run(&self.normalize(raw), scope).await
    }

    /// Wit.ai processor built from the `nlp` section
    pub fn nlp_processor(&self) -> Result<BoxedNlpProcessor> {
        let timeout = Duration::from_secs(self.config.settings.request_timeout_seconds);
        let processor = WitAiProcessor::new(&self.config.nlp, self.normalizer.clone(), timeout)?;
        Ok(Box::new(processor))
    }
}
