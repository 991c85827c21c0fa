//! Certificate authority lifecycle: create, read, update and delete
//! orchestration against the remote PKI provider.

use pcaflow_core::error::{PcaError, PcaResult};
use pcaflow_core::models::authority::{
    AuthorityArtifacts, AuthorityStatus, AuthorityType, CertificateAuthority,
    CreateCertificateAuthority, DeletionRetention, UpdateCertificateAuthority, Validity,
};
use pcaflow_core::provider::{
    AuthorityDescription, CreateAuthorityRequest, PcaClient, TagRegistry, UpdateAuthorityRequest,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::poller::{ActivationPoller, PollOutcome};
use crate::retry::{Backoff, classify_create_error, escalate};
use crate::self_sign::RootSelfSigner;

const ENTITY: &str = "certificate authority";

/// Outcome of fetching an artifact that only exists in some statuses.
enum Artifact<T> {
    Available(T),
    /// The authority exists but is not in a status that defines it.
    NotYetDefined,
    /// The authority disappeared between calls.
    Gone,
}

fn artifact<T>(result: PcaResult<T>) -> PcaResult<Artifact<T>> {
    match result {
        Ok(value) => Ok(Artifact::Available(value)),
        Err(PcaError::WrongState { .. }) => Ok(Artifact::NotYetDefined),
        Err(PcaError::NotFound { .. }) => Ok(Artifact::Gone),
        Err(e) => Err(e),
    }
}

/// Certificate authority lifecycle manager.
///
/// Generic over the provider and tag registry so the orchestration has no
/// dependency on a concrete transport. Holds no per-authority state; one
/// manager may serve concurrent callers working on different authorities.
pub struct CertificateAuthorityManager<P: PcaClient, T: TagRegistry> {
    client: P,
    tags: T,
    config: LifecycleConfig,
}

impl<P: PcaClient, T: TagRegistry> CertificateAuthorityManager<P, T> {
    pub fn new(client: P, tags: T, config: LifecycleConfig) -> Self {
        Self {
            client,
            tags,
            config,
        }
    }

    pub fn client(&self) -> &P {
        &self.client
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Create an authority and block until it is usable.
    ///
    /// Root authorities are self-signed before returning. Any failure after
    /// the provider assigned an id is wrapped in
    /// [`PcaError::PartiallyCreated`], whose id the caller must record so
    /// the authority can be deleted or repaired with
    /// [`resume_root_self_sign`](Self::resume_root_self_sign).
    pub async fn create(&self, input: CreateCertificateAuthority) -> PcaResult<CertificateAuthority> {
        // 1. Local preconditions, before any remote call.
        let validity = input.validate()?;

        // 2. One idempotency token for every attempt of this create.
        let request = CreateAuthorityRequest {
            authority_type: input.authority_type,
            crypto_config: input.crypto_config.clone(),
            revocation_config: input.revocation_config.clone(),
            tags: input.tags.clone(),
            idempotency_token: Uuid::new_v4().to_string(),
        };

        info!(
            authority_type = %input.authority_type,
            subject = %input.crypto_config.subject.distinguished_name(),
            "creating certificate authority"
        );
        let id = self.create_with_retry(&request).await?;
        info!(id = %id, "certificate authority created");

        self.complete_creation(&id, &input, validity)
            .await
            .map_err(|e| PcaError::PartiallyCreated {
                id,
                source: Box::new(e),
            })
    }

    async fn complete_creation(
        &self,
        id: &str,
        input: &CreateCertificateAuthority,
        validity: Option<Validity>,
    ) -> PcaResult<CertificateAuthority> {
        // 3. Wait for CREATING to settle.
        let status = self.wait_for_activation(id).await?;
        debug!(id, %status, "certificate authority settled");

        // 4. Self-sign roots.
        if let Some(validity) = validity {
            RootSelfSigner::new(&self.client, &self.config)
                .run(id, input.crypto_config.signing_algorithm, validity)
                .await?;
        }

        // 5. Authoritative snapshot.
        self.read(id)
            .await?
            .ok_or_else(|| PcaError::not_found(ENTITY, id))
    }

    /// Issues the create call, retrying the S3 permission propagation
    /// failure with backoff inside the configured budget. Once the budget
    /// is spent the call is attempted one last time before giving up.
    async fn create_with_retry(&self, request: &CreateAuthorityRequest) -> PcaResult<String> {
        let deadline = Instant::now() + self.config.create_retry_budget();
        let mut backoff = Backoff::new(
            self.config.retry_initial_backoff_ms,
            self.config.retry_max_backoff_ms,
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(attempt, "calling CreateCertificateAuthority");
            let err = match self.client.create_authority(request.clone()).await {
                Ok(id) => return Ok(id),
                Err(e) => classify_create_error(e),
            };
            if !matches!(err, PcaError::TransientProvider { .. }) {
                return Err(err);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(attempt, "create retry budget exhausted, making a final attempt");
                return self
                    .client
                    .create_authority(request.clone())
                    .await
                    .map_err(|e| escalate(classify_create_error(e)));
            }

            let delay = backoff.next_delay().min(deadline - now);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient create failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn wait_for_activation(&self, id: &str) -> PcaResult<AuthorityStatus> {
        let poller = ActivationPoller::new(self.config.poll_interval(), self.config.create_timeout());
        let client = &self.client;

        let outcome = poller
            .poll(
                id,
                "certificate authority activation",
                AuthorityStatus::CREATION_PENDING,
                AuthorityStatus::CREATION_TARGET,
                move || async move {
                    let description = client.describe_authority(id).await?;
                    let status = description.status;
                    Ok::<_, PcaError>((description, status))
                },
            )
            .await?;

        match outcome {
            PollOutcome::Reached { status, .. } => Ok(status),
            PollOutcome::Absent => Err(PcaError::not_found(ENTITY, id)),
            PollOutcome::Diverged { status, .. } => Err(PcaError::provider(
                "DescribeCertificateAuthority",
                "UnexpectedStatus",
                format!("certificate authority {id} entered status {status} while being created"),
            )),
        }
    }

    /// Fetch the current snapshot of an authority.
    ///
    /// Returns `Ok(None)` when the authority does not exist. Artifacts that
    /// the current status does not define yet are reported as empty.
    pub async fn read(&self, id: &str) -> PcaResult<Option<CertificateAuthority>> {
        debug!(id, "reading certificate authority");
        let description = match self.client.describe_authority(id).await {
            Ok(d) => d,
            Err(PcaError::NotFound { .. }) => {
                warn!(id, "certificate authority not found, treating as absent");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let (certificate, certificate_chain) =
            match artifact(self.client.get_authority_certificate(id).await)? {
                Artifact::Available(c) => (c.certificate, c.certificate_chain.unwrap_or_default()),
                Artifact::NotYetDefined => (String::new(), String::new()),
                Artifact::Gone => {
                    warn!(id, "certificate authority disappeared while reading its certificate");
                    return Ok(None);
                }
            };

        let certificate_signing_request = match artifact(self.client.get_authority_csr(id).await)? {
            Artifact::Available(csr) => csr,
            Artifact::NotYetDefined => String::new(),
            Artifact::Gone => {
                warn!(id, "certificate authority disappeared while reading its CSR");
                return Ok(None);
            }
        };

        let tags = match self.tags.list_tags(id).await {
            Ok(tags) => tags,
            Err(PcaError::NotFound { .. }) => {
                warn!(id, "certificate authority disappeared while listing tags");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(assemble(
            description,
            AuthorityArtifacts {
                certificate,
                certificate_chain,
                certificate_signing_request,
                ..Default::default()
            },
            tags,
        )))
    }

    /// Apply a change record and return the post-update snapshot.
    ///
    /// Status and revocation changes go out in one combined call; tags are
    /// reconciled separately through the tag registry.
    pub async fn update(
        &self,
        id: &str,
        changes: UpdateCertificateAuthority,
    ) -> PcaResult<CertificateAuthority> {
        if let Some(revocation) = &changes.revocation_config {
            revocation.validate()?;
        }

        if changes.touches_authority() {
            let request = UpdateAuthorityRequest {
                authority_id: id.to_string(),
                status: changes.enabled.map(AuthorityStatus::from_enabled),
                revocation_config: changes.revocation_config.clone(),
            };
            info!(
                id,
                status = ?request.status,
                revocation_changed = request.revocation_config.is_some(),
                "updating certificate authority"
            );
            self.client.update_authority(request).await?;
        }

        if let Some(tags) = &changes.tags {
            debug!(id, old = tags.old.len(), new = tags.new.len(), "reconciling tags");
            self.tags.update_tags(id, &tags.old, &tags.new).await?;
        }

        self.read(id)
            .await?
            .ok_or_else(|| PcaError::not_found(ENTITY, id))
    }

    /// Schedule deletion. Returns once the provider accepted the request;
    /// the authority stays readable until the retention period ends.
    pub async fn delete(&self, id: &str, retention: DeletionRetention) -> PcaResult<()> {
        info!(id, retention_days = retention.days(), "scheduling certificate authority deletion");
        match self.client.delete_authority(id, retention.days()).await {
            Ok(()) => Ok(()),
            Err(PcaError::NotFound { .. }) => {
                warn!(id, "certificate authority already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Re-run root self-signing for an authority whose create was
    /// interrupted after activation.
    ///
    /// The authority must be a root in `PENDING_CERTIFICATE`; anything else
    /// is a [`PcaError::WrongState`].
    pub async fn resume_root_self_sign(
        &self,
        id: &str,
        validity: Validity,
    ) -> PcaResult<CertificateAuthority> {
        let description = self.client.describe_authority(id).await?;

        if description.authority_type != AuthorityType::Root {
            return Err(wrong_state(
                id,
                format!("only ROOT authorities are self-signed, this one is {}", description.authority_type),
            ));
        }
        if description.status != AuthorityStatus::PendingCertificate {
            return Err(wrong_state(
                id,
                format!("expected PENDING_CERTIFICATE, found {:?}", description.status),
            ));
        }

        info!(id, "resuming root self-signing");
        RootSelfSigner::new(&self.client, &self.config)
            .run(id, description.crypto_config.signing_algorithm, validity)
            .await?;

        self.read(id)
            .await?
            .ok_or_else(|| PcaError::not_found(ENTITY, id))
    }
}

fn assemble(
    description: AuthorityDescription,
    mut artifacts: AuthorityArtifacts,
    tags: pcaflow_core::models::authority::Tags,
) -> CertificateAuthority {
    artifacts.serial = description.serial;
    artifacts.not_before = description.not_before;
    artifacts.not_after = description.not_after;

    CertificateAuthority {
        id: description.id,
        authority_type: description.authority_type,
        crypto_config: description.crypto_config,
        revocation_config: description.revocation_config,
        enabled: description.status.is_enabled(),
        status: description.status,
        artifacts,
        tags,
    }
}

fn wrong_state(id: &str, message: String) -> PcaError {
    PcaError::WrongState {
        entity: ENTITY.into(),
        id: id.to_string(),
        operation: "self-sign".into(),
        message,
    }
}
