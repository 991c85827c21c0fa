//! Call log entries recorded by the in-memory provider.

use pcaflow_core::models::authority::{AuthorityStatus, Tags};

/// Provider operation, used to count calls and to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAuthority,
    DescribeAuthority,
    UpdateAuthority,
    DeleteAuthority,
    GetAuthorityCertificate,
    GetAuthorityCsr,
    IssueCertificate,
    GetCertificate,
    ImportCertificate,
    ListTags,
    UpdateTags,
}

/// One recorded provider call with the arguments tests assert on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAuthority {
        idempotency_token: String,
    },
    DescribeAuthority {
        id: String,
    },
    UpdateAuthority {
        id: String,
        status: Option<AuthorityStatus>,
        revocation_changed: bool,
    },
    DeleteAuthority {
        id: String,
        retention_days: u32,
    },
    GetAuthorityCertificate {
        id: String,
    },
    GetAuthorityCsr {
        id: String,
    },
    IssueCertificate {
        authority_id: String,
        template_arn: String,
    },
    GetCertificate {
        certificate_id: String,
    },
    ImportCertificate {
        authority_id: String,
    },
    ListTags {
        id: String,
    },
    UpdateTags {
        id: String,
        removed: Vec<String>,
        added: Tags,
    },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::CreateAuthority { .. } => Operation::CreateAuthority,
            Call::DescribeAuthority { .. } => Operation::DescribeAuthority,
            Call::UpdateAuthority { .. } => Operation::UpdateAuthority,
            Call::DeleteAuthority { .. } => Operation::DeleteAuthority,
            Call::GetAuthorityCertificate { .. } => Operation::GetAuthorityCertificate,
            Call::GetAuthorityCsr { .. } => Operation::GetAuthorityCsr,
            Call::IssueCertificate { .. } => Operation::IssueCertificate,
            Call::GetCertificate { .. } => Operation::GetCertificate,
            Call::ImportCertificate { .. } => Operation::ImportCertificate,
            Call::ListTags { .. } => Operation::ListTags,
            Call::UpdateTags { .. } => Operation::UpdateTags,
        }
    }
}
