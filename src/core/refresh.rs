//! Refresh actor: the store's single entry point into a connector.

use std::sync::Arc;
use std::time::Instant;

use super::connector::UsageProviderConnector;
use super::models::UsageSnapshot;
use super::provider::Provider;
use crate::error::Result;

/// Runs fetches against one connector.
///
/// Holds no per-provider state, so concurrent refreshes for different
/// providers never interfere. Results are not cached.
#[derive(Clone)]
pub struct UsageRefreshActor {
    connector: Arc<dyn UsageProviderConnector>,
}

impl std::fmt::Debug for UsageRefreshActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageRefreshActor")
            .field("auth_mode", &self.connector.auth_mode())
            .finish()
    }
}

impl UsageRefreshActor {
    #[must_use]
    pub fn new(connector: Arc<dyn UsageProviderConnector>) -> Self {
        Self { connector }
    }

    #[must_use]
    pub fn connector(&self) -> &Arc<dyn UsageProviderConnector> {
        &self.connector
    }

    /// Fetch a fresh snapshot for `provider`.
    ///
    /// # Errors
    ///
    /// Whatever the connector returns.
    #[tracing::instrument(skip(self), fields(provider = %provider))]
    pub async fn refresh(&self, provider: Provider) -> Result<UsageSnapshot> {
        let start = Instant::now();
        let result = self.connector.fetch_usage(provider).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(_) => tracing::debug!(duration_ms, "Fetch succeeded"),
            Err(e) => tracing::debug!(duration_ms, error = %e, "Fetch failed"),
        }
        result
    }
}
