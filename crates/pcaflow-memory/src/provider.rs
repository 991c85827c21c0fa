//! In-memory implementation of [`PcaClient`] and [`TagRegistry`].
//!
//! Simulates the provider's asynchronous authority lifecycle: authorities
//! start out `CREATING`, settle after a configurable number of describe
//! calls, and move from `PENDING_CERTIFICATE` to `ACTIVE` once a CA
//! certificate is imported. Every call is recorded, and one-shot failures
//! can be queued per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use pcaflow_core::error::{INVALID_STATE, PcaError, PcaResult, RESOURCE_NOT_FOUND};
use pcaflow_core::models::authority::{
    AuthorityStatus, DELETION_RETENTION_DAYS_MAX, DELETION_RETENTION_DAYS_MIN, Tags,
};
use pcaflow_core::provider::{
    AuthorityCertificate, AuthorityDescription, CreateAuthorityRequest, ImportCertificateRequest,
    IssuanceStatus, IssueCertificateRequest, IssuedCertificate, PcaClient, TagRegistry,
    UpdateAuthorityRequest,
};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::call::{Call, Operation};
use crate::simulation::SimulationConfig;

const AUTHORITY: &str = "certificate authority";
const CERTIFICATE: &str = "certificate";

const S3_PERMISSION_FAILURE: &str = "The ACM Private CA service account 'acm-pca-prod' requires \
     getBucketAcl permissions for your S3 bucket. Check your S3 bucket permissions and try again.";

struct StoredAuthority {
    description: AuthorityDescription,
    creating_polls_left: u32,
    csr: String,
    certificate: Option<AuthorityCertificate>,
    tags: Tags,
    deletion_retention_days: Option<u32>,
}

struct StoredCertificate {
    authority_id: String,
    pending_polls_left: u32,
    certificate: String,
}

#[derive(Default)]
struct State {
    authorities: HashMap<String, StoredAuthority>,
    tokens: HashMap<String, String>,
    certificates: HashMap<String, StoredCertificate>,
    create_calls: u32,
    calls: Vec<Call>,
    failures: HashMap<Operation, VecDeque<PcaError>>,
}

impl State {
    /// Logs the call and pops any failure queued for its operation.
    fn record(&mut self, call: Call) -> PcaResult<()> {
        let operation = call.operation();
        debug!(?call, "simulated provider call");
        self.calls.push(call);
        match self.failures.get_mut(&operation).and_then(|q| q.pop_front()) {
            Some(err) => {
                debug!(?operation, error = %err, "returning injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn authority(&self, operation: &str, id: &str) -> PcaResult<&StoredAuthority> {
        self.authorities
            .get(id)
            .ok_or_else(|| missing(operation, AUTHORITY, id))
    }

    fn authority_mut(&mut self, operation: &str, id: &str) -> PcaResult<&mut StoredAuthority> {
        self.authorities
            .get_mut(id)
            .ok_or_else(|| missing(operation, AUTHORITY, id))
    }
}

fn missing(operation: &str, entity: &str, id: &str) -> PcaError {
    PcaError::from_provider_code(
        operation,
        entity,
        id,
        RESOURCE_NOT_FOUND,
        format!("Could not find {entity} {id}"),
    )
}

fn invalid_state(operation: &str, id: &str, message: impl Into<String>) -> PcaError {
    PcaError::from_provider_code(operation, AUTHORITY, id, INVALID_STATE, message)
}

fn s3_permission_failure() -> PcaError {
    PcaError::provider(
        "CreateCertificateAuthority",
        "ValidationException",
        S3_PERMISSION_FAILURE,
    )
}

fn fake_pem(label: &str) -> String {
    let mut der = [0u8; 96];
    rand::rng().fill(&mut der[..]);
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        STANDARD.encode(der)
    )
}

fn random_serial() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

/// Simulated PKI provider and tag registry sharing one store.
///
/// Clones share state, so one clone can be handed to a manager while the
/// test keeps another for assertions.
#[derive(Clone)]
pub struct InMemoryPca {
    state: Arc<Mutex<State>>,
    config: Arc<SimulationConfig>,
}

impl Default for InMemoryPca {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl InMemoryPca {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Queue a failure returned by the next call of `operation`, before it
    /// has any effect.
    pub async fn inject_failure(&self, operation: Operation, err: PcaError) {
        self.state
            .lock()
            .await
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub async fn authority_count(&self) -> usize {
        self.state.lock().await.authorities.len()
    }

    /// Force an authority into `status`, bypassing transition rules.
    pub async fn set_status(&self, id: &str, status: AuthorityStatus) -> PcaResult<()> {
        let mut state = self.state.lock().await;
        let authority = state.authority_mut("SetStatus", id)?;
        authority.description.status = status;
        authority.creating_polls_left = 0;
        Ok(())
    }

    /// Retention days of a scheduled deletion, if one was requested.
    pub async fn scheduled_deletion(&self, id: &str) -> Option<u32> {
        self.state
            .lock()
            .await
            .authorities
            .get(id)
            .and_then(|a| a.deletion_retention_days)
    }

    /// End the retention period: the authority disappears for good.
    pub async fn purge(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.certificates.retain(|_, c| c.authority_id != id);
        state.authorities.remove(id).is_some()
    }
}

impl PcaClient for InMemoryPca {
    async fn create_authority(&self, input: CreateAuthorityRequest) -> PcaResult<String> {
        let mut state = self.state.lock().await;
        state.record(Call::CreateAuthority {
            idempotency_token: input.idempotency_token.clone(),
        })?;

        state.create_calls += 1;
        let call_number = state.create_calls;
        if call_number <= self.config.transient_create_failures {
            return Err(s3_permission_failure());
        }

        let id = match state.tokens.get(&input.idempotency_token) {
            Some(existing) => {
                debug!(id = %existing, "idempotency token already used, returning existing authority");
                existing.clone()
            }
            None => {
                let id = self.config.authority_arn(&Uuid::new_v4().to_string());
                let authority = StoredAuthority {
                    description: AuthorityDescription {
                        id: id.clone(),
                        authority_type: input.authority_type,
                        crypto_config: input.crypto_config,
                        revocation_config: input.revocation_config,
                        status: AuthorityStatus::Creating,
                        serial: None,
                        not_before: None,
                        not_after: None,
                    },
                    creating_polls_left: self.config.creating_polls,
                    csr: fake_pem("CERTIFICATE REQUEST"),
                    certificate: None,
                    tags: input.tags,
                    deletion_retention_days: None,
                };
                state.authorities.insert(id.clone(), authority);
                state.tokens.insert(input.idempotency_token, id.clone());
                info!(id = %id, "simulated certificate authority created");
                id
            }
        };

        if call_number <= self.config.transient_create_failures + self.config.lost_create_responses {
            return Err(s3_permission_failure());
        }
        Ok(id)
    }

    async fn describe_authority(&self, id: &str) -> PcaResult<AuthorityDescription> {
        let mut state = self.state.lock().await;
        state.record(Call::DescribeAuthority { id: id.to_string() })?;

        let settled_status = self.config.settled_status;
        let authority = state.authority_mut("DescribeCertificateAuthority", id)?;
        if authority.description.status == AuthorityStatus::Creating {
            if authority.creating_polls_left > 0 {
                authority.creating_polls_left -= 1;
            } else {
                authority.description.status = settled_status;
                debug!(id, status = %settled_status, "simulated certificate authority settled");
            }
        }
        Ok(authority.description.clone())
    }

    async fn update_authority(&self, input: UpdateAuthorityRequest) -> PcaResult<()> {
        const OPERATION: &str = "UpdateCertificateAuthority";
        let mut state = self.state.lock().await;
        state.record(Call::UpdateAuthority {
            id: input.authority_id.clone(),
            status: input.status,
            revocation_changed: input.revocation_config.is_some(),
        })?;

        let id = input.authority_id.as_str();
        let authority = state.authority_mut(OPERATION, id)?;
        if authority.deletion_retention_days.is_some() {
            return Err(invalid_state(OPERATION, id, "authority is scheduled for deletion"));
        }

        if let Some(target) = input.status {
            let toggleable = [AuthorityStatus::Active, AuthorityStatus::Disabled];
            let current = authority.description.status;
            if !current.is_in(&toggleable) || !target.is_in(&toggleable) {
                return Err(invalid_state(
                    OPERATION,
                    id,
                    format!("cannot change status from {current} to {target}"),
                ));
            }
            authority.description.status = target;
        }
        if let Some(revocation) = input.revocation_config {
            authority.description.revocation_config = Some(revocation);
        }
        Ok(())
    }

    async fn delete_authority(&self, id: &str, retention_days: u32) -> PcaResult<()> {
        const OPERATION: &str = "DeleteCertificateAuthority";
        let mut state = self.state.lock().await;
        state.record(Call::DeleteAuthority {
            id: id.to_string(),
            retention_days,
        })?;

        if !(DELETION_RETENTION_DAYS_MIN..=DELETION_RETENTION_DAYS_MAX).contains(&retention_days) {
            return Err(PcaError::provider(
                OPERATION,
                "ValidationException",
                format!("permanentDeletionTimeInDays {retention_days} is out of range"),
            ));
        }

        let authority = state.authority_mut(OPERATION, id)?;
        authority.deletion_retention_days = Some(retention_days);
        info!(id, retention_days, "simulated certificate authority scheduled for deletion");
        Ok(())
    }

    async fn get_authority_certificate(&self, id: &str) -> PcaResult<AuthorityCertificate> {
        const OPERATION: &str = "GetCertificateAuthorityCertificate";
        let mut state = self.state.lock().await;
        state.record(Call::GetAuthorityCertificate { id: id.to_string() })?;

        let authority = state.authority(OPERATION, id)?;
        authority.certificate.clone().ok_or_else(|| {
            invalid_state(
                OPERATION,
                id,
                format!("no certificate installed, status is {}", authority.description.status),
            )
        })
    }

    async fn get_authority_csr(&self, id: &str) -> PcaResult<String> {
        const OPERATION: &str = "GetCertificateAuthorityCsr";
        let mut state = self.state.lock().await;
        state.record(Call::GetAuthorityCsr { id: id.to_string() })?;

        let authority = state.authority(OPERATION, id)?;
        match authority.description.status {
            AuthorityStatus::Creating | AuthorityStatus::Failed => Err(invalid_state(
                OPERATION,
                id,
                format!("no CSR in status {}", authority.description.status),
            )),
            _ => Ok(authority.csr.clone()),
        }
    }

    async fn issue_certificate(&self, input: IssueCertificateRequest) -> PcaResult<String> {
        const OPERATION: &str = "IssueCertificate";
        let mut state = self.state.lock().await;
        state.record(Call::IssueCertificate {
            authority_id: input.authority_id.clone(),
            template_arn: input.template_arn.clone(),
        })?;

        let id = input.authority_id.as_str();
        let authority = state.authority(OPERATION, id)?;
        if !authority
            .description
            .status
            .is_in(&[AuthorityStatus::PendingCertificate, AuthorityStatus::Active])
        {
            return Err(invalid_state(
                OPERATION,
                id,
                format!("cannot issue in status {}", authority.description.status),
            ));
        }
        if input.csr.trim().is_empty() {
            return Err(PcaError::provider(OPERATION, "MalformedCSRException", "empty CSR"));
        }

        let certificate_id = format!("{id}/certificate/{}", Uuid::new_v4().simple());
        state.certificates.insert(
            certificate_id.clone(),
            StoredCertificate {
                authority_id: id.to_string(),
                pending_polls_left: self.config.issuance_pending_polls,
                certificate: fake_pem("CERTIFICATE"),
            },
        );
        Ok(certificate_id)
    }

    async fn get_certificate(
        &self,
        authority_id: &str,
        certificate_id: &str,
    ) -> PcaResult<IssuedCertificate> {
        const OPERATION: &str = "GetCertificate";
        let mut state = self.state.lock().await;
        state.record(Call::GetCertificate {
            certificate_id: certificate_id.to_string(),
        })?;

        state.authority(OPERATION, authority_id)?;
        let stored = state
            .certificates
            .get_mut(certificate_id)
            .filter(|c| c.authority_id == authority_id)
            .ok_or_else(|| missing(OPERATION, CERTIFICATE, certificate_id))?;

        if stored.pending_polls_left > 0 {
            stored.pending_polls_left -= 1;
            return Ok(IssuedCertificate {
                certificate_id: certificate_id.to_string(),
                status: IssuanceStatus::Pending,
                certificate: String::new(),
                certificate_chain: None,
            });
        }
        Ok(IssuedCertificate {
            certificate_id: certificate_id.to_string(),
            status: IssuanceStatus::Issued,
            certificate: stored.certificate.clone(),
            certificate_chain: None,
        })
    }

    async fn import_authority_certificate(&self, input: ImportCertificateRequest) -> PcaResult<()> {
        const OPERATION: &str = "ImportCertificateAuthorityCertificate";
        let mut state = self.state.lock().await;
        state.record(Call::ImportCertificate {
            authority_id: input.authority_id.clone(),
        })?;

        let id = input.authority_id.as_str();
        let authority = state.authority_mut(OPERATION, id)?;
        if authority.deletion_retention_days.is_some() {
            return Err(invalid_state(OPERATION, id, "authority is scheduled for deletion"));
        }
        let status = authority.description.status;
        if status.is_in(&[AuthorityStatus::Creating, AuthorityStatus::Failed]) {
            return Err(invalid_state(
                OPERATION,
                id,
                format!("cannot import a certificate in status {status}"),
            ));
        }
        if input.certificate.trim().is_empty() {
            return Err(PcaError::provider(
                OPERATION,
                "MalformedCertificateException",
                "empty certificate",
            ));
        }

        let now = Utc::now();
        authority.certificate = Some(AuthorityCertificate {
            certificate: input.certificate,
            certificate_chain: input.certificate_chain,
        });
        authority.description.serial = Some(random_serial());
        authority.description.not_before = Some(now);
        authority.description.not_after = Some(now + Duration::days(self.config.imported_validity_days));
        if status == AuthorityStatus::PendingCertificate {
            authority.description.status = AuthorityStatus::Active;
        }
        info!(id, "simulated certificate authority certificate imported");
        Ok(())
    }
}

impl TagRegistry for InMemoryPca {
    async fn list_tags(&self, id: &str) -> PcaResult<Tags> {
        let mut state = self.state.lock().await;
        state.record(Call::ListTags { id: id.to_string() })?;
        Ok(state.authority("ListTags", id)?.tags.clone())
    }

    async fn update_tags(&self, id: &str, old: &Tags, new: &Tags) -> PcaResult<()> {
        let removed: Vec<String> = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .cloned()
            .collect();
        let added: Tags = new
            .iter()
            .filter(|(k, v)| old.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut state = self.state.lock().await;
        state.record(Call::UpdateTags {
            id: id.to_string(),
            removed: removed.clone(),
            added: added.clone(),
        })?;

        let authority = state.authority_mut("TagCertificateAuthority", id)?;
        for key in &removed {
            authority.tags.remove(key);
        }
        authority.tags.extend(added);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pcaflow_core::models::authority::{
        AuthorityType, CryptoConfig, KeyAlgorithm, SigningAlgorithm, Validity, ValidityUnit,
    };
    use pcaflow_core::models::subject::Asn1Subject;

    use super::*;

    fn request(token: &str) -> CreateAuthorityRequest {
        CreateAuthorityRequest {
            authority_type: AuthorityType::Root,
            crypto_config: CryptoConfig {
                key_algorithm: KeyAlgorithm::Rsa4096,
                signing_algorithm: SigningAlgorithm::Sha512WithRsa,
                subject: Asn1Subject {
                    common_name: Some("example.com".into()),
                    ..Default::default()
                },
            },
            revocation_config: None,
            tags: Tags::new(),
            idempotency_token: token.into(),
        }
    }

    #[tokio::test]
    async fn authority_settles_after_configured_polls() {
        let pca = InMemoryPca::new(SimulationConfig {
            creating_polls: 2,
            ..SimulationConfig::default()
        });
        let id = pca.create_authority(request("t1")).await.unwrap();
        assert!(id.starts_with("arn:aws:acm-pca:us-west-2:123456789012:certificate-authority/"));

        let statuses: Vec<AuthorityStatus> = {
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(pca.describe_authority(&id).await.unwrap().status);
            }
            out
        };
        assert_eq!(
            statuses,
            vec![
                AuthorityStatus::Creating,
                AuthorityStatus::Creating,
                AuthorityStatus::PendingCertificate,
            ]
        );
    }

    #[tokio::test]
    async fn same_token_returns_same_authority() {
        let pca = InMemoryPca::default();
        let first = pca.create_authority(request("token")).await.unwrap();
        let second = pca.create_authority(request("token")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(pca.authority_count().await, 1);
    }

    #[tokio::test]
    async fn csr_and_certificate_depend_on_status() {
        let pca = InMemoryPca::new(SimulationConfig::instant());
        let id = pca.create_authority(request("t")).await.unwrap();

        assert!(pca.get_authority_csr(&id).await.unwrap_err().is_wrong_state());
        pca.describe_authority(&id).await.unwrap();
        assert!(pca.get_authority_csr(&id).await.unwrap().contains("CERTIFICATE REQUEST"));
        assert!(pca.get_authority_certificate(&id).await.unwrap_err().is_wrong_state());

        pca.import_authority_certificate(ImportCertificateRequest {
            authority_id: id.clone(),
            certificate: fake_pem("CERTIFICATE"),
            certificate_chain: None,
        })
        .await
        .unwrap();

        let description = pca.describe_authority(&id).await.unwrap();
        assert_eq!(description.status, AuthorityStatus::Active);
        assert!(description.serial.is_some());
        assert!(description.not_after > description.not_before);
    }

    #[tokio::test]
    async fn issued_certificate_is_pending_first() {
        let pca = InMemoryPca::new(SimulationConfig {
            creating_polls: 0,
            issuance_pending_polls: 1,
            ..SimulationConfig::default()
        });
        let id = pca.create_authority(request("t")).await.unwrap();
        pca.describe_authority(&id).await.unwrap();
        let csr = pca.get_authority_csr(&id).await.unwrap();

        let certificate_id = pca
            .issue_certificate(IssueCertificateRequest {
                authority_id: id.clone(),
                csr,
                signing_algorithm: SigningAlgorithm::Sha512WithRsa,
                template_arn: "template".into(),
                validity: Validity {
                    length: 10,
                    unit: ValidityUnit::Years,
                },
                idempotency_token: "issue".into(),
            })
            .await
            .unwrap();

        let first = pca.get_certificate(&id, &certificate_id).await.unwrap();
        assert_eq!(first.status, IssuanceStatus::Pending);
        assert!(first.certificate.is_empty());

        let second = pca.get_certificate(&id, &certificate_id).await.unwrap();
        assert_eq!(second.status, IssuanceStatus::Issued);
        assert!(second.certificate.starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[tokio::test]
    async fn status_toggles_only_between_active_and_disabled() {
        let pca = InMemoryPca::new(SimulationConfig::instant());
        let id = pca.create_authority(request("t")).await.unwrap();
        pca.describe_authority(&id).await.unwrap();

        let err = pca
            .update_authority(UpdateAuthorityRequest {
                authority_id: id.clone(),
                status: Some(AuthorityStatus::Disabled),
                revocation_config: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_wrong_state());

        pca.set_status(&id, AuthorityStatus::Active).await.unwrap();
        pca.update_authority(UpdateAuthorityRequest {
            authority_id: id.clone(),
            status: Some(AuthorityStatus::Disabled),
            revocation_config: None,
        })
        .await
        .unwrap();
        assert_eq!(
            pca.describe_authority(&id).await.unwrap().status,
            AuthorityStatus::Disabled
        );
    }

    #[tokio::test]
    async fn deleted_authority_stays_visible_until_purged() {
        let pca = InMemoryPca::default();
        let id = pca.create_authority(request("t")).await.unwrap();

        let err = pca.delete_authority(&id, 3).await.unwrap_err();
        assert!(matches!(err, PcaError::Provider { .. }));

        pca.delete_authority(&id, 7).await.unwrap();
        assert_eq!(pca.scheduled_deletion(&id).await, Some(7));
        assert!(pca.describe_authority(&id).await.is_ok());

        assert!(pca.purge(&id).await);
        assert!(pca.describe_authority(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_tags_applies_removals_and_additions() {
        let pca = InMemoryPca::default();
        let mut input = request("t");
        input.tags = Tags::from([
            ("env".to_string(), "dev".to_string()),
            ("team".to_string(), "pki".to_string()),
        ]);
        let old = input.tags.clone();
        let id = pca.create_authority(input).await.unwrap();

        let new = Tags::from([
            ("env".to_string(), "prod".to_string()),
            ("owner".to_string(), "sec".to_string()),
        ]);
        pca.update_tags(&id, &old, &new).await.unwrap();
        assert_eq!(pca.list_tags(&id).await.unwrap(), new);

        let calls = pca.calls().await;
        assert!(calls.contains(&Call::UpdateTags {
            id: id.clone(),
            removed: vec!["team".into()],
            added: new.clone(),
        }));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let pca = InMemoryPca::default();
        pca.inject_failure(
            Operation::CreateAuthority,
            PcaError::provider("CreateCertificateAuthority", "LimitExceededException", "quota"),
        )
        .await;

        assert!(pca.create_authority(request("t")).await.is_err());
        assert_eq!(pca.authority_count().await, 0);
        assert!(pca.create_authority(request("t")).await.is_ok());
        assert_eq!(pca.call_count(Operation::CreateAuthority).await, 2);
    }
}
