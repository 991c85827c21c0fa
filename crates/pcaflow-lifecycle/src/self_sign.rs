//! Self-signing of root certificate authorities.
//!
//! A new root authority sits in `PENDING_CERTIFICATE` until it is given a
//! CA certificate. The signer asks the authority to sign its own CSR with
//! the root CA template, waits for the certificate and imports it, which
//! moves the authority to `ACTIVE`.

use pcaflow_core::error::{PcaError, PcaResult, SelfSignStep};
use pcaflow_core::models::authority::{SigningAlgorithm, Validity};
use pcaflow_core::provider::{
    ImportCertificateRequest, IssuanceStatus, IssueCertificateRequest, PcaClient,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::poller::{ActivationPoller, PollOutcome};

pub struct RootSelfSigner<'a, P: PcaClient> {
    client: &'a P,
    config: &'a LifecycleConfig,
}

impl<'a, P: PcaClient> RootSelfSigner<'a, P> {
    pub fn new(client: &'a P, config: &'a LifecycleConfig) -> Self {
        Self { client, config }
    }

    /// Runs CSR → issue → wait → fetch → import for authority `id`.
    ///
    /// Stops at the first failing step and reports it as
    /// [`PcaError::SelfSign`]. Steps already completed are not rolled back.
    pub async fn run(
        &self,
        id: &str,
        signing_algorithm: SigningAlgorithm,
        validity: Validity,
    ) -> PcaResult<()> {
        // 1. CSR; WrongState if the authority has none yet.
        debug!(id, "fetching certificate signing request");
        let csr = self
            .client
            .get_authority_csr(id)
            .await
            .map_err(|e| step_failed(id, SelfSignStep::FetchCsr, e))?;

        // 2. Issue the root certificate against the authority's own CSR.
        let idempotency_token = Uuid::new_v4().to_string();
        debug!(
            id,
            template = %self.config.root_ca_template,
            %signing_algorithm,
            validity_length = validity.length,
            validity_unit = %validity.unit,
            "issuing self-signed root certificate"
        );
        let certificate_id = self
            .client
            .issue_certificate(IssueCertificateRequest {
                authority_id: id.to_string(),
                csr,
                signing_algorithm,
                template_arn: self.config.root_ca_template.clone(),
                validity,
                idempotency_token,
            })
            .await
            .map_err(|e| step_failed(id, SelfSignStep::IssueCertificate, e))?;

        // 3. Wait until the certificate is issued.
        self.wait_for_issuance(id, &certificate_id)
            .await
            .map_err(|e| step_failed(id, SelfSignStep::WaitForIssuance, e))?;

        // 4. Fetch it.
        let issued = self
            .client
            .get_certificate(id, &certificate_id)
            .await
            .map_err(|e| step_failed(id, SelfSignStep::FetchCertificate, e))?;
        if issued.certificate.is_empty() {
            return Err(step_failed(
                id,
                SelfSignStep::FetchCertificate,
                PcaError::WrongState {
                    entity: "certificate".into(),
                    id: certificate_id,
                    operation: "GetCertificate".into(),
                    message: "issued certificate has no body".into(),
                },
            ));
        }

        // 5. Install it as the authority's own CA certificate.
        self.client
            .import_authority_certificate(ImportCertificateRequest {
                authority_id: id.to_string(),
                certificate: issued.certificate,
                certificate_chain: None,
            })
            .await
            .map_err(|e| step_failed(id, SelfSignStep::ImportCertificate, e))?;

        info!(id, certificate_id = %issued.certificate_id, "root certificate authority self-signed");
        Ok(())
    }

    async fn wait_for_issuance(&self, id: &str, certificate_id: &str) -> PcaResult<()> {
        let poller = ActivationPoller::new(
            self.config.issuance_poll_interval(),
            self.config.issuance_timeout(),
        );
        let client = self.client;

        let outcome = poller
            .poll(
                certificate_id,
                "certificate issuance",
                &[IssuanceStatus::Pending],
                &[IssuanceStatus::Issued],
                move || async move {
                    let issued = client.get_certificate(id, certificate_id).await?;
                    let status = issued.status;
                    Ok::<_, PcaError>((issued, status))
                },
            )
            .await?;

        match outcome {
            PollOutcome::Reached { .. } => Ok(()),
            PollOutcome::Absent => Err(PcaError::not_found("certificate", certificate_id)),
            PollOutcome::Diverged { status, .. } => Err(PcaError::provider(
                "GetCertificate",
                "RequestFailedException",
                format!("certificate {certificate_id} ended in status {status:?}"),
            )),
        }
    }
}

fn step_failed(id: &str, step: SelfSignStep, source: PcaError) -> PcaError {
    PcaError::SelfSign {
        id: id.to_string(),
        step,
        source: Box::new(source),
    }
}
