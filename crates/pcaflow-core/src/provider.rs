//! Provider trait definitions for the remote PKI service and the tag
//! registry.
//!
//! All provider operations are async request/response calls. Implementations
//! must report a missing entity as [`PcaError::NotFound`] and an entity in
//! the wrong state as [`PcaError::WrongState`]; every other failure is a
//! [`PcaError::Provider`] carrying the provider's error code verbatim.
//!
//! [`PcaError::NotFound`]: crate::error::PcaError::NotFound
//! [`PcaError::WrongState`]: crate::error::PcaError::WrongState
//! [`PcaError::Provider`]: crate::error::PcaError::Provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PcaResult;
use crate::models::authority::{
    AuthorityStatus, AuthorityType, CryptoConfig, SigningAlgorithm, Tags, Validity,
};
use crate::models::revocation::RevocationConfiguration;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthorityRequest {
    pub authority_type: AuthorityType,
    pub crypto_config: CryptoConfig,
    pub revocation_config: Option<RevocationConfiguration>,
    pub tags: Tags,
    /// Repeating a request with the same token must not create a second
    /// authority.
    pub idempotency_token: String,
}

/// What the provider reports about an authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorityDescription {
    pub id: String,
    pub authority_type: AuthorityType,
    pub crypto_config: CryptoConfig,
    pub revocation_config: Option<RevocationConfiguration>,
    pub status: AuthorityStatus,
    pub serial: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

/// Combined status / revocation update. Unset fields are left alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateAuthorityRequest {
    pub authority_id: String,
    pub status: Option<AuthorityStatus>,
    pub revocation_config: Option<RevocationConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorityCertificate {
    pub certificate: String,
    pub certificate_chain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCertificateRequest {
    pub authority_id: String,
    pub csr: String,
    pub signing_algorithm: SigningAlgorithm,
    pub template_arn: String,
    pub validity: Validity,
    pub idempotency_token: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssuanceStatus {
    Pending,
    Issued,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate_id: String,
    pub status: IssuanceStatus,
    /// Empty until issued.
    pub certificate: String,
    pub certificate_chain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCertificateRequest {
    pub authority_id: String,
    pub certificate: String,
    pub certificate_chain: Option<String>,
}

// ---------------------------------------------------------------------------
// Remote PKI service
// ---------------------------------------------------------------------------

pub trait PcaClient: Send + Sync {
    /// Returns the id of the new (or, for a repeated token, existing)
    /// authority.
    fn create_authority(
        &self,
        input: CreateAuthorityRequest,
    ) -> impl Future<Output = PcaResult<String>> + Send;
    fn describe_authority(
        &self,
        id: &str,
    ) -> impl Future<Output = PcaResult<AuthorityDescription>> + Send;
    fn update_authority(
        &self,
        input: UpdateAuthorityRequest,
    ) -> impl Future<Output = PcaResult<()>> + Send;
    /// Schedules deletion after `retention_days`; the authority stays
    /// visible until it is purged.
    fn delete_authority(
        &self,
        id: &str,
        retention_days: u32,
    ) -> impl Future<Output = PcaResult<()>> + Send;
    /// Fails with `WrongState` while no CA certificate is installed.
    fn get_authority_certificate(
        &self,
        id: &str,
    ) -> impl Future<Output = PcaResult<AuthorityCertificate>> + Send;
    /// Fails with `WrongState` while no CSR exists yet.
    fn get_authority_csr(&self, id: &str) -> impl Future<Output = PcaResult<String>> + Send;
    /// Returns the id of the certificate being issued.
    fn issue_certificate(
        &self,
        input: IssueCertificateRequest,
    ) -> impl Future<Output = PcaResult<String>> + Send;
    fn get_certificate(
        &self,
        authority_id: &str,
        certificate_id: &str,
    ) -> impl Future<Output = PcaResult<IssuedCertificate>> + Send;
    /// Installs a CA certificate, overwriting any previous one.
    fn import_authority_certificate(
        &self,
        input: ImportCertificateRequest,
    ) -> impl Future<Output = PcaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tag registry
// ---------------------------------------------------------------------------

pub trait TagRegistry: Send + Sync {
    fn list_tags(&self, id: &str) -> impl Future<Output = PcaResult<Tags>> + Send;
    /// Removes keys present in `old` but not in `new`, then adds or
    /// overwrites every pair of `new` that differs from `old`.
    fn update_tags(
        &self,
        id: &str,
        old: &Tags,
        new: &Tags,
    ) -> impl Future<Output = PcaResult<()>> + Send;
}
