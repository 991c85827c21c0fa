//! Behaviour knobs for the in-memory provider.

use pcaflow_core::models::authority::AuthorityStatus;

/// Configuration for the simulated PKI provider.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Region segment of generated authority ids.
    pub region: String,
    /// Account segment of generated authority ids.
    pub account_id: String,
    /// Describe calls that report `CREATING` before a new authority
    /// settles (default: 1).
    pub creating_polls: u32,
    /// Status a new authority settles into once it leaves `CREATING`
    /// (default: `PENDING_CERTIFICATE`).
    pub settled_status: AuthorityStatus,
    /// Leading create calls rejected with the S3 bucket permission error,
    /// without side effects (default: 0).
    pub transient_create_failures: u32,
    /// Create calls, after the transient failures, that take effect but
    /// report the S3 bucket permission error instead of the id
    /// (default: 0).
    pub lost_create_responses: u32,
    /// Get calls that report an issued certificate as still pending
    /// (default: 1).
    pub issuance_pending_polls: u32,
    /// Validity of imported CA certificates in days (default: 365).
    pub imported_validity_days: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".into(),
            account_id: "123456789012".into(),
            creating_polls: 1,
            settled_status: AuthorityStatus::PendingCertificate,
            transient_create_failures: 0,
            lost_create_responses: 0,
            issuance_pending_polls: 1,
            imported_validity_days: 365,
        }
    }
}

impl SimulationConfig {
    /// Settles immediately and issues without delay.
    pub fn instant() -> Self {
        Self {
            creating_polls: 0,
            issuance_pending_polls: 0,
            ..Self::default()
        }
    }

    pub(crate) fn authority_arn(&self, suffix: &str) -> String {
        format!(
            "arn:aws:acm-pca:{}:{}:certificate-authority/{suffix}",
            self.region, self.account_id
        )
    }
}
