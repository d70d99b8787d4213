use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::bingx::BingxClient;
use crate::common::errors::Result;
use crate::common::traits::BoxedBroker;
use crate::config::types::{Account, AppConfig, BrokerKind};

/// An enabled account paired with its exclusive broker connection
///
/// The connection sits behind an async mutex so that at most one pipeline
/// talks to an account at a time.
pub struct AccountSession {
    account: Account,
    broker: Mutex<BoxedBroker>,
}

impl AccountSession {
    pub fn new(account: Account, broker: BoxedBroker) -> Self {
        Self {
            account,
            broker: Mutex::new(broker),
        }
    }

    pub fn name(&self) -> &str {
        &self.account.name
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Wait for exclusive use of the connection
    pub async fn lock(&self) -> MutexGuard<'_, BoxedBroker> {
        self.broker.lock().await
    }
}

impl std::fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Build one session per enabled account, in configuration order
///
/// `force_demo` routes every account to its exchange's demo environment.
pub fn build_sessions(config: &AppConfig, force_demo: bool) -> Result<Vec<AccountSession>> {
    let timeout = Duration::from_secs(config.settings.request_timeout_seconds);

    config
        .enabled_accounts()
        .into_iter()
        .map(|account| {
            let demo = force_demo || account.demo;
            let broker: BoxedBroker = match account.broker {
                BrokerKind::Bingx => Box::new(BingxClient::new(account.credentials(), demo, timeout)?),
            };

            info!(
                account = %account.name,
                broker = %account.broker,
                demo,
                "Account connection ready"
            );
            Ok(AccountSession::new(account.clone(), broker))
        })
        .collect()
}
