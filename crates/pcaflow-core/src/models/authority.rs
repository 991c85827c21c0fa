//! Certificate authority domain model.
//!
//! A certificate authority is hosted by a remote PKI provider. Only its id
//! is persisted by callers; every other field is recomputed on read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PcaError, PcaResult};
use crate::models::revocation::RevocationConfiguration;
use crate::models::subject::Asn1Subject;

/// Resource tags, ordered by key.
pub type Tags = BTreeMap<String, String>;

pub const DELETION_RETENTION_DAYS_MIN: u32 = 7;
pub const DELETION_RETENTION_DAYS_MAX: u32 = 30;
pub const DELETION_RETENTION_DAYS_DEFAULT: u32 = 30;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AuthorityType {
    #[serde(rename = "ROOT")]
    Root,
    #[default]
    #[serde(rename = "SUBORDINATE")]
    Subordinate,
}

wire_enum!(AuthorityType, "authority type", {
    Root => "ROOT",
    Subordinate => "SUBORDINATE",
});

/// Provider-owned lifecycle status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AuthorityStatus {
    /// No status observed yet.
    #[default]
    #[serde(rename = "")]
    Unobserved,
    #[serde(rename = "CREATING")]
    Creating,
    #[serde(rename = "PENDING_CERTIFICATE")]
    PendingCertificate,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "DISABLED")]
    Disabled,
    #[serde(rename = "EXPIRED")]
    Expired,
    #[serde(rename = "FAILED")]
    Failed,
}

wire_enum!(AuthorityStatus, "authority status", {
    Unobserved => "",
    Creating => "CREATING",
    PendingCertificate => "PENDING_CERTIFICATE",
    Active => "ACTIVE",
    Disabled => "DISABLED",
    Expired => "EXPIRED",
    Failed => "FAILED",
});

impl AuthorityStatus {
    /// Statuses an authority passes through right after the create call.
    pub const CREATION_PENDING: &'static [AuthorityStatus] =
        &[AuthorityStatus::Unobserved, AuthorityStatus::Creating];

    /// Statuses in which a freshly created authority is usable or awaits
    /// its CA certificate.
    pub const CREATION_TARGET: &'static [AuthorityStatus] = &[
        AuthorityStatus::Active,
        AuthorityStatus::PendingCertificate,
    ];

    /// Status requested from the provider for the given `enabled` flag.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            AuthorityStatus::Active
        } else {
            AuthorityStatus::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != AuthorityStatus::Disabled
    }

    pub fn is_in(&self, set: &[AuthorityStatus]) -> bool {
        set.contains(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    #[serde(rename = "RSA_2048")]
    Rsa2048,
    #[serde(rename = "RSA_4096")]
    Rsa4096,
    #[serde(rename = "EC_prime256v1")]
    EcPrime256v1,
    #[serde(rename = "EC_secp384r1")]
    EcSecp384r1,
}

wire_enum!(KeyAlgorithm, "key algorithm", {
    Rsa2048 => "RSA_2048",
    Rsa4096 => "RSA_4096",
    EcPrime256v1 => "EC_prime256v1",
    EcSecp384r1 => "EC_secp384r1",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    #[serde(rename = "SHA256WITHECDSA")]
    Sha256WithEcdsa,
    #[serde(rename = "SHA384WITHECDSA")]
    Sha384WithEcdsa,
    #[serde(rename = "SHA512WITHECDSA")]
    Sha512WithEcdsa,
    #[serde(rename = "SHA256WITHRSA")]
    Sha256WithRsa,
    #[serde(rename = "SHA384WITHRSA")]
    Sha384WithRsa,
    #[serde(rename = "SHA512WITHRSA")]
    Sha512WithRsa,
}

wire_enum!(SigningAlgorithm, "signing algorithm", {
    Sha256WithEcdsa => "SHA256WITHECDSA",
    Sha384WithEcdsa => "SHA384WITHECDSA",
    Sha512WithEcdsa => "SHA512WITHECDSA",
    Sha256WithRsa => "SHA256WITHRSA",
    Sha384WithRsa => "SHA384WITHRSA",
    Sha512WithRsa => "SHA512WITHRSA",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValidityUnit {
    #[serde(rename = "ABSOLUTE")]
    Absolute,
    #[serde(rename = "DAYS")]
    Days,
    #[serde(rename = "END_DATE")]
    EndDate,
    #[serde(rename = "MONTHS")]
    Months,
    #[serde(rename = "YEARS")]
    Years,
}

wire_enum!(ValidityUnit, "validity unit", {
    Absolute => "ABSOLUTE",
    Days => "DAYS",
    EndDate => "END_DATE",
    Months => "MONTHS",
    Years => "YEARS",
});

/// Validity of a self-signed root CA certificate. Used once, during
/// self-signing, and never read back from the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Validity {
    pub length: u64,
    pub unit: ValidityUnit,
}

/// Key and subject configuration, fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CryptoConfig {
    pub key_algorithm: KeyAlgorithm,
    pub signing_algorithm: SigningAlgorithm,
    pub subject: Asn1Subject,
}

/// Read-only artifacts. Empty until the authority reaches a status in
/// which the provider defines them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorityArtifacts {
    /// PEM-encoded CA certificate.
    pub certificate: String,
    /// PEM-encoded chain above the CA certificate; empty for a root.
    pub certificate_chain: String,
    /// PEM-encoded certificate signing request.
    pub certificate_signing_request: String,
    pub serial: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

/// Snapshot of a certificate authority as observed through read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateAuthority {
    /// Provider-assigned identifier (ARN).
    pub id: String,
    pub authority_type: AuthorityType,
    pub crypto_config: CryptoConfig,
    pub revocation_config: Option<RevocationConfiguration>,
    /// `true` unless the status is `DISABLED`.
    pub enabled: bool,
    pub status: AuthorityStatus,
    pub artifacts: AuthorityArtifacts,
    pub tags: Tags,
}

impl CertificateAuthority {
    pub fn mutable_fields(&self) -> MutableFields {
        MutableFields {
            enabled: self.enabled,
            revocation_config: self.revocation_config.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Number of days a deleted authority remains restorable (7..=30).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletionRetention(u32);

impl DeletionRetention {
    pub fn new(days: u32) -> PcaResult<Self> {
        if !(DELETION_RETENTION_DAYS_MIN..=DELETION_RETENTION_DAYS_MAX).contains(&days) {
            return Err(PcaError::validation(format!(
                "deletion retention must be between {DELETION_RETENTION_DAYS_MIN} and \
                 {DELETION_RETENTION_DAYS_MAX} days, got {days}"
            )));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl Default for DeletionRetention {
    fn default() -> Self {
        Self(DELETION_RETENTION_DAYS_DEFAULT)
    }
}

/// Fields required to create a new certificate authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCertificateAuthority {
    pub authority_type: AuthorityType,
    pub crypto_config: CryptoConfig,
    pub revocation_config: Option<RevocationConfiguration>,
    pub tags: Tags,
    /// Defaults to 30 days when unset.
    pub deletion_retention_days: Option<u32>,
    /// Required for `ROOT`, ignored otherwise.
    pub validity_length: Option<u64>,
    /// Required for `ROOT`, ignored otherwise.
    pub validity_unit: Option<ValidityUnit>,
}

impl CreateCertificateAuthority {
    pub fn new(authority_type: AuthorityType, crypto_config: CryptoConfig) -> Self {
        Self {
            authority_type,
            crypto_config,
            revocation_config: None,
            tags: Tags::new(),
            deletion_retention_days: None,
            validity_length: None,
            validity_unit: None,
        }
    }

    /// Checks every local precondition and returns the self-signing
    /// validity for a root authority (`None` for a subordinate).
    pub fn validate(&self) -> PcaResult<Option<Validity>> {
        self.crypto_config.subject.validate()?;
        if let Some(revocation) = &self.revocation_config {
            revocation.validate()?;
        }
        self.deletion_retention()?;

        match self.authority_type {
            AuthorityType::Subordinate => Ok(None),
            AuthorityType::Root => {
                let length = self.validity_length.filter(|l| *l > 0).ok_or_else(|| {
                    PcaError::validation(
                        "validity_length must be set when creating a root certificate authority",
                    )
                })?;
                let unit = self.validity_unit.ok_or_else(|| {
                    PcaError::validation(
                        "validity_unit must be set when creating a root certificate authority",
                    )
                })?;
                Ok(Some(Validity { length, unit }))
            }
        }
    }

    pub fn deletion_retention(&self) -> PcaResult<DeletionRetention> {
        match self.deletion_retention_days {
            Some(days) => DeletionRetention::new(days),
            None => Ok(DeletionRetention::default()),
        }
    }
}

/// The fields of an authority that may change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutableFields {
    pub enabled: bool,
    pub revocation_config: Option<RevocationConfiguration>,
    pub tags: Tags,
}

/// Old and new tag sets handed to the tag registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagChange {
    pub old: Tags,
    pub new: Tags,
}

/// Explicit change record for an update. `None` = no change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateCertificateAuthority {
    pub enabled: Option<bool>,
    pub revocation_config: Option<RevocationConfiguration>,
    pub tags: Option<TagChange>,
}

impl UpdateCertificateAuthority {
    /// Compares the desired mutable fields against the last observed ones.
    ///
    /// Dropping a revocation or CRL block that the provider still reports
    /// is not a change: the provider keeps its configuration until a new
    /// block (for example one with `enabled = false`) is supplied.
    pub fn between(observed: &MutableFields, desired: &MutableFields) -> Self {
        let enabled = (observed.enabled != desired.enabled).then_some(desired.enabled);

        let revocation_config = desired.revocation_config.as_ref().and_then(|wanted| {
            let crl_configuration = wanted.crl_configuration.clone().or_else(|| {
                observed
                    .revocation_config
                    .as_ref()
                    .and_then(|r| r.crl_configuration.clone())
            });
            let effective = RevocationConfiguration { crl_configuration };
            (observed.revocation_config.as_ref() != Some(&effective)).then_some(effective)
        });

        let tags = (observed.tags != desired.tags).then(|| TagChange {
            old: observed.tags.clone(),
            new: desired.tags.clone(),
        });

        Self {
            enabled,
            revocation_config,
            tags,
        }
    }

    /// Whether the combined status/revocation update call is needed.
    pub fn touches_authority(&self) -> bool {
        self.enabled.is_some() || self.revocation_config.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_authority() && self.tags.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::revocation::CrlConfiguration;

    fn crypto() -> CryptoConfig {
        CryptoConfig {
            key_algorithm: KeyAlgorithm::Rsa4096,
            signing_algorithm: SigningAlgorithm::Sha512WithRsa,
            subject: Asn1Subject {
                common_name: Some("example.com".into()),
                ..Default::default()
            },
        }
    }

    fn crl(enabled: bool) -> RevocationConfiguration {
        RevocationConfiguration {
            crl_configuration: Some(CrlConfiguration {
                enabled,
                expiration_in_days: 7,
                s3_bucket_name: Some("crl-bucket".into()),
                custom_cname: None,
            }),
        }
    }

    fn fields(enabled: bool, revocation: Option<RevocationConfiguration>) -> MutableFields {
        MutableFields {
            enabled,
            revocation_config: revocation,
            tags: Tags::new(),
        }
    }

    #[test]
    fn wire_names_round_trip() {
        for status in AuthorityStatus::ALL {
            assert_eq!(status.as_str().parse::<AuthorityStatus>().unwrap(), *status);
        }
        assert_eq!(
            "EC_prime256v1".parse::<KeyAlgorithm>().unwrap(),
            KeyAlgorithm::EcPrime256v1
        );
        assert!("RSA_1024".parse::<KeyAlgorithm>().is_err());
        assert_eq!(AuthorityStatus::Unobserved.as_str(), "");
    }

    #[test]
    fn enabled_is_derived_from_status() {
        assert!(AuthorityStatus::Active.is_enabled());
        assert!(AuthorityStatus::PendingCertificate.is_enabled());
        assert!(!AuthorityStatus::Disabled.is_enabled());
    }

    #[test]
    fn subordinate_never_requires_validity() {
        let input = CreateCertificateAuthority::new(AuthorityType::Subordinate, crypto());
        assert_eq!(input.validate().unwrap(), None);
    }

    #[test]
    fn root_requires_both_validity_fields() {
        let mut input = CreateCertificateAuthority::new(AuthorityType::Root, crypto());
        assert!(matches!(input.validate(), Err(PcaError::Validation { .. })));

        input.validity_length = Some(1);
        assert!(matches!(input.validate(), Err(PcaError::Validation { .. })));

        input.validity_length = None;
        input.validity_unit = Some(ValidityUnit::Years);
        assert!(matches!(input.validate(), Err(PcaError::Validation { .. })));

        input.validity_length = Some(1);
        assert_eq!(
            input.validate().unwrap(),
            Some(Validity {
                length: 1,
                unit: ValidityUnit::Years
            })
        );
    }

    #[test]
    fn zero_validity_length_counts_as_unset() {
        let mut input = CreateCertificateAuthority::new(AuthorityType::Root, crypto());
        input.validity_length = Some(0);
        input.validity_unit = Some(ValidityUnit::Days);
        assert!(input.validate().is_err());
    }

    #[test]
    fn retention_bounds() {
        assert!(DeletionRetention::new(6).is_err());
        assert_eq!(DeletionRetention::new(7).unwrap().days(), 7);
        assert!(DeletionRetention::new(31).is_err());
        assert_eq!(DeletionRetention::default().days(), 30);
    }

    #[test]
    fn toggling_enabled_only_changes_status() {
        let observed = fields(true, Some(crl(true)));
        let desired = fields(false, Some(crl(true)));
        let changes = UpdateCertificateAuthority::between(&observed, &desired);
        assert_eq!(changes.enabled, Some(false));
        assert_eq!(changes.revocation_config, None);
        assert_eq!(changes.tags, None);
        assert!(changes.touches_authority());
    }

    #[test]
    fn removing_revocation_block_is_suppressed() {
        let observed = fields(true, Some(crl(true)));
        let desired = fields(true, None);
        assert!(UpdateCertificateAuthority::between(&observed, &desired).is_empty());

        let desired = fields(true, Some(RevocationConfiguration::default()));
        assert!(UpdateCertificateAuthority::between(&observed, &desired).is_empty());
    }

    #[test]
    fn disabling_crl_is_a_change() {
        let observed = fields(true, Some(crl(true)));
        let desired = fields(true, Some(crl(false)));
        let changes = UpdateCertificateAuthority::between(&observed, &desired);
        assert_eq!(changes.revocation_config, Some(crl(false)));
        assert_eq!(changes.enabled, None);
    }

    #[test]
    fn tag_changes_carry_both_sides() {
        let observed = fields(true, None);
        let mut desired = observed.clone();
        desired.tags.insert("env".into(), "prod".into());
        let changes = UpdateCertificateAuthority::between(&observed, &desired);
        assert!(!changes.touches_authority());
        let tags = changes.tags.unwrap();
        assert!(tags.old.is_empty());
        assert_eq!(tags.new.get("env").map(String::as_str), Some("prod"));
    }
}
