//! Certificate attachment model.
//!
//! An attachment is not a provider entity: it records a one-way import of
//! an externally signed CA certificate into an existing authority. The
//! provider keeps a single certificate slot per authority, so a later
//! import overwrites an earlier one and nothing can be detached.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateAttachment {
    /// Locally synthesized `<authority id>-<unique suffix>`.
    pub id: String,
    pub authority_id: String,
    /// The authority's current PEM certificate.
    pub certificate: String,
    /// The authority's current PEM chain; empty for a self-signed root.
    pub certificate_chain: String,
}

/// Fields required to attach a certificate to an authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCertificateAttachment {
    pub authority_id: String,
    /// PEM-encoded CA certificate signed by the parent authority.
    pub certificate_body: String,
    /// PEM-encoded chain up to (and including) the trust anchor.
    pub certificate_chain: Option<String>,
}
