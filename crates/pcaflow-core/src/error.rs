//! Error types for CA lifecycle orchestration.

use std::time::Duration;

use thiserror::Error;

/// Provider error code returned when the addressed entity does not exist.
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

/// Provider error code returned when an entity is in the wrong state for
/// the requested operation.
pub const INVALID_STATE: &str = "InvalidStateException";

/// Step of the root self-signing sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfSignStep {
    FetchCsr,
    IssueCertificate,
    WaitForIssuance,
    FetchCertificate,
    ImportCertificate,
}

impl std::fmt::Display for SelfSignStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SelfSignStep::FetchCsr => "fetch certificate signing request",
            SelfSignStep::IssueCertificate => "issue root certificate",
            SelfSignStep::WaitForIssuance => "wait for root certificate issuance",
            SelfSignStep::FetchCertificate => "fetch issued root certificate",
            SelfSignStep::ImportCertificate => "import root certificate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PcaError {
    /// Local precondition failure, raised before any remote call.
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Known-recoverable provider condition. Retried by the caller within a
    /// bounded budget and escalated to [`PcaError::Provider`] afterwards.
    #[error("Transient provider error during {operation}: {message}")]
    TransientProvider { operation: String, message: String },

    #[error("{entity} {id} is in the wrong state for {operation}: {message}")]
    WrongState {
        entity: String,
        id: String,
        operation: String,
        message: String,
    },

    #[error("Timed out after {elapsed:?} waiting for {waiting_for} on {id}")]
    Timeout {
        id: String,
        waiting_for: String,
        elapsed: Duration,
    },

    #[error("Provider error during {operation} ({code}): {message}")]
    Provider {
        operation: String,
        code: String,
        message: String,
    },

    #[error("Self-signing root CA {id} failed at step '{step}': {source}")]
    SelfSign {
        id: String,
        step: SelfSignStep,
        #[source]
        source: Box<PcaError>,
    },

    /// Creation failed after the provider assigned an id. The remote
    /// authority exists and must be recorded so it can be deleted or
    /// repaired later.
    #[error("Certificate authority {id} was created but is incomplete: {source}")]
    PartiallyCreated {
        id: String,
        #[source]
        source: Box<PcaError>,
    },
}

impl PcaError {
    pub fn validation(message: impl Into<String>) -> Self {
        PcaError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        PcaError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn provider(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PcaError::Provider {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Maps a raw provider failure onto the error contract of the provider
    /// traits: a missing entity becomes `NotFound`, an entity in the wrong
    /// state becomes `WrongState`, anything else stays a `Provider` error.
    pub fn from_provider_code(
        operation: &str,
        entity: &str,
        id: &str,
        code: &str,
        message: impl Into<String>,
    ) -> Self {
        match code {
            RESOURCE_NOT_FOUND => PcaError::not_found(entity, id),
            INVALID_STATE => PcaError::WrongState {
                entity: entity.to_string(),
                id: id.to_string(),
                operation: operation.to_string(),
                message: message.into(),
            },
            _ => PcaError::provider(operation, code, message),
        }
    }

    /// The innermost error, skipping `SelfSign` and `PartiallyCreated`
    /// context.
    pub fn root_cause(&self) -> &PcaError {
        match self {
            PcaError::SelfSign { source, .. } | PcaError::PartiallyCreated { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Id of the authority left behind by a failed create, if any.
    pub fn created_id(&self) -> Option<&str> {
        match self {
            PcaError::PartiallyCreated { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), PcaError::NotFound { .. })
    }

    pub fn is_wrong_state(&self) -> bool {
        matches!(self.root_cause(), PcaError::WrongState { .. })
    }
}

pub type PcaResult<T> = Result<T, PcaError>;
