//! Lifecycle orchestration configuration.

use std::time::Duration;

/// Template used to self-sign a root CA certificate.
pub const ROOT_CA_TEMPLATE: &str = "arn:aws:acm-pca:::template/RootCACertificate/V1";

/// Timeouts, intervals and retry budgets for lifecycle operations.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Budget for a new authority to leave `CREATING` (default: 60).
    pub create_timeout_secs: u64,
    /// Interval between activation polls in milliseconds (default: 2000).
    pub poll_interval_ms: u64,
    /// Wall-clock budget for retrying a transient create failure
    /// (default: 60).
    pub create_retry_budget_secs: u64,
    /// First backoff between create retries in milliseconds (default: 500).
    pub retry_initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds (default: 10_000).
    pub retry_max_backoff_ms: u64,
    /// Budget for a self-signed root certificate to be issued
    /// (default: 180).
    pub issuance_timeout_secs: u64,
    /// Interval between issuance polls in milliseconds (default: 3000).
    pub issuance_poll_interval_ms: u64,
    /// Certificate template for root self-signing.
    pub root_ca_template: String,
}

impl LifecycleConfig {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn create_retry_budget(&self) -> Duration {
        Duration::from_secs(self.create_retry_budget_secs)
    }

    pub fn issuance_timeout(&self) -> Duration {
        Duration::from_secs(self.issuance_timeout_secs)
    }

    pub fn issuance_poll_interval(&self) -> Duration {
        Duration::from_millis(self.issuance_poll_interval_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            create_timeout_secs: 60,
            poll_interval_ms: 2_000,
            create_retry_budget_secs: 60,
            retry_initial_backoff_ms: 500,
            retry_max_backoff_ms: 10_000,
            issuance_timeout_secs: 180,
            issuance_poll_interval_ms: 3_000,
            root_ca_template: ROOT_CA_TEMPLATE.into(),
        }
    }
}
