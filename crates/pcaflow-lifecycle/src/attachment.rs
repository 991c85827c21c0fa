//! One-way import of an externally signed CA certificate.
//!
//! Attaching a certificate overwrites the authority's only certificate
//! slot. There is no detach: [`CertificateAttachmentManager::delete`] does
//! nothing at the provider, and the imported certificate stays in place
//! until another import replaces it.

use pcaflow_core::error::{PcaError, PcaResult};
use pcaflow_core::models::attachment::{CertificateAttachment, CreateCertificateAttachment};
use pcaflow_core::provider::{ImportCertificateRequest, PcaClient};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct CertificateAttachmentManager<P: PcaClient> {
    client: P,
}

impl<P: PcaClient> CertificateAttachmentManager<P> {
    pub fn new(client: P) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &P {
        &self.client
    }

    /// Import the certificate and return the resulting attachment.
    ///
    /// A missing authority surfaces as [`PcaError::NotFound`]; one that
    /// cannot accept a certificate right now as [`PcaError::WrongState`].
    pub async fn create(&self, input: CreateCertificateAttachment) -> PcaResult<CertificateAttachment> {
        if input.certificate_body.trim().is_empty() {
            return Err(PcaError::validation("certificate body must not be empty"));
        }

        info!(authority_id = %input.authority_id, "importing certificate authority certificate");
        self.client
            .import_authority_certificate(ImportCertificateRequest {
                authority_id: input.authority_id.clone(),
                certificate: input.certificate_body,
                certificate_chain: input.certificate_chain.filter(|c| !c.is_empty()),
            })
            .await?;

        let id = format!("{}-{}", input.authority_id, Uuid::new_v4().simple());
        debug!(id = %id, "certificate attached");

        self.read(&id, &input.authority_id).await?.ok_or_else(|| {
            PcaError::not_found("certificate authority", input.authority_id.as_str())
        })
    }

    /// The authority's current certificate, whichever import installed it.
    ///
    /// Returns `Ok(None)` if the authority is gone or has no certificate.
    pub async fn read(
        &self,
        id: &str,
        authority_id: &str,
    ) -> PcaResult<Option<CertificateAttachment>> {
        match self.client.get_authority_certificate(authority_id).await {
            Ok(current) => Ok(Some(CertificateAttachment {
                id: id.to_string(),
                authority_id: authority_id.to_string(),
                certificate: current.certificate,
                certificate_chain: current.certificate_chain.unwrap_or_default(),
            })),
            Err(PcaError::NotFound { .. }) => {
                warn!(id, authority_id, "certificate authority not found, treating attachment as absent");
                Ok(None)
            }
            Err(PcaError::WrongState { .. }) => {
                warn!(id, authority_id, "certificate authority has no certificate, treating attachment as absent");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Forget the attachment locally. The certificate stays installed.
    pub fn delete(&self, attachment: &CertificateAttachment) {
        warn!(
            id = %attachment.id,
            authority_id = %attachment.authority_id,
            "certificate attachments cannot be removed; the certificate remains installed"
        );
    }
}
