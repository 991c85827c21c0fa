//! Mapping between the nested block representation used by configuration
//! front ends and the typed domain records.
//!
//! A block is a list holding zero or one JSON object. Zero objects means the
//! block is absent; one object whose fields are all defaults is a present
//! block and stays distinct from an absent one in both directions.
//!
//! `flatten_*` writes every known key, with `""` for an unset string.
//! `expand_*` reads `""` and missing keys alike as "not set".

use serde_json::{Map, Value};

use crate::error::{PcaError, PcaResult};
use crate::models::authority::{
    AuthorityType, CertificateAuthority, CreateCertificateAuthority, CryptoConfig, KeyAlgorithm,
    SigningAlgorithm, Tags, ValidityUnit,
};
use crate::models::revocation::{CrlConfiguration, RevocationConfiguration};
use crate::models::subject::Asn1Subject;

pub type Block = Vec<Map<String, Value>>;

// ---------------------------------------------------------------------------
// ASN.1 subject
// ---------------------------------------------------------------------------

pub fn flatten_subject(subject: Option<&Asn1Subject>) -> Block {
    let Some(subject) = subject else {
        return Block::new();
    };
    let mut m = Map::new();
    for (name, value, _) in subject.bounded_fields() {
        m.insert(name.into(), Value::String(value.unwrap_or_default().into()));
    }
    vec![m]
}

pub fn expand_subject(block: &[Map<String, Value>]) -> Option<Asn1Subject> {
    let m = block.first()?;
    Some(Asn1Subject {
        common_name: string(m, "common_name"),
        country: string(m, "country"),
        distinguished_name_qualifier: string(m, "distinguished_name_qualifier"),
        generation_qualifier: string(m, "generation_qualifier"),
        given_name: string(m, "given_name"),
        initials: string(m, "initials"),
        locality: string(m, "locality"),
        organization: string(m, "organization"),
        organizational_unit: string(m, "organizational_unit"),
        pseudonym: string(m, "pseudonym"),
        state: string(m, "state"),
        surname: string(m, "surname"),
        title: string(m, "title"),
    })
}

// ---------------------------------------------------------------------------
// Crypto configuration
// ---------------------------------------------------------------------------

pub fn flatten_crypto_config(config: Option<&CryptoConfig>) -> Block {
    let Some(config) = config else {
        return Block::new();
    };
    let mut m = Map::new();
    m.insert("key_algorithm".into(), config.key_algorithm.as_str().into());
    m.insert(
        "signing_algorithm".into(),
        config.signing_algorithm.as_str().into(),
    );
    m.insert("subject".into(), block_value(flatten_subject(Some(&config.subject))));
    vec![m]
}

pub fn expand_crypto_config(block: &[Map<String, Value>]) -> PcaResult<Option<CryptoConfig>> {
    let Some(m) = block.first() else {
        return Ok(None);
    };
    let key_algorithm = required_string(m, "key_algorithm")?.parse::<KeyAlgorithm>()?;
    let signing_algorithm =
        required_string(m, "signing_algorithm")?.parse::<SigningAlgorithm>()?;
    let subject = expand_subject(&nested(m, "subject")?).ok_or_else(|| {
        PcaError::validation("certificate authority configuration requires a subject block")
    })?;
    Ok(Some(CryptoConfig {
        key_algorithm,
        signing_algorithm,
        subject,
    }))
}

// ---------------------------------------------------------------------------
// Revocation configuration
// ---------------------------------------------------------------------------

pub fn flatten_crl_config(config: Option<&CrlConfiguration>) -> Block {
    let Some(config) = config else {
        return Block::new();
    };
    let mut m = Map::new();
    m.insert(
        "custom_cname".into(),
        config.custom_cname.clone().unwrap_or_default().into(),
    );
    m.insert("enabled".into(), config.enabled.into());
    m.insert("expiration_in_days".into(), config.expiration_in_days.into());
    m.insert(
        "s3_bucket_name".into(),
        config.s3_bucket_name.clone().unwrap_or_default().into(),
    );
    vec![m]
}

pub fn expand_crl_config(block: &[Map<String, Value>]) -> PcaResult<Option<CrlConfiguration>> {
    let Some(m) = block.first() else {
        return Ok(None);
    };
    let expiration_in_days = m
        .get("expiration_in_days")
        .and_then(Value::as_u64)
        .filter(|days| *days > 0)
        .ok_or_else(|| {
            PcaError::validation("crl_configuration.expiration_in_days must be set")
        })?;
    let expiration_in_days = u32::try_from(expiration_in_days).map_err(|_| {
        PcaError::validation(format!(
            "crl_configuration.expiration_in_days out of range: {expiration_in_days}"
        ))
    })?;
    Ok(Some(CrlConfiguration {
        enabled: m.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        expiration_in_days,
        s3_bucket_name: string(m, "s3_bucket_name"),
        custom_cname: string(m, "custom_cname"),
    }))
}

pub fn flatten_revocation_config(config: Option<&RevocationConfiguration>) -> Block {
    let Some(config) = config else {
        return Block::new();
    };
    let mut m = Map::new();
    m.insert(
        "crl_configuration".into(),
        block_value(flatten_crl_config(config.crl_configuration.as_ref())),
    );
    vec![m]
}

pub fn expand_revocation_config(
    block: &[Map<String, Value>],
) -> PcaResult<Option<RevocationConfiguration>> {
    let Some(m) = block.first() else {
        return Ok(None);
    };
    Ok(Some(RevocationConfiguration {
        crl_configuration: expand_crl_config(&nested(m, "crl_configuration")?)?,
    }))
}

// ---------------------------------------------------------------------------
// Whole resource
// ---------------------------------------------------------------------------

/// Reads a create request from its flat representation.
///
/// Recognised keys: `type`, `certificate_authority_configuration`,
/// `revocation_configuration`, `tags`, `permanent_deletion_time_in_days`,
/// `validity_length`, `validity_unit`. Validation of the result is left to
/// [`CreateCertificateAuthority::validate`].
pub fn expand_create_input(m: &Map<String, Value>) -> PcaResult<CreateCertificateAuthority> {
    let authority_type = match string(m, "type") {
        Some(t) => t.parse::<AuthorityType>()?,
        None => AuthorityType::default(),
    };
    let crypto_config = expand_crypto_config(&nested(m, "certificate_authority_configuration")?)?
        .ok_or_else(|| {
            PcaError::validation("certificate_authority_configuration block is required")
        })?;

    let mut input = CreateCertificateAuthority::new(authority_type, crypto_config);
    input.revocation_config = expand_revocation_config(&nested(m, "revocation_configuration")?)?;
    input.tags = tags(m)?;
    input.deletion_retention_days = optional_u32(m, "permanent_deletion_time_in_days")?;
    input.validity_length = m.get("validity_length").and_then(Value::as_u64);
    input.validity_unit = string(m, "validity_unit")
        .map(|u| u.parse::<ValidityUnit>())
        .transpose()?;
    Ok(input)
}

/// Renders an observed snapshot in the flat representation.
pub fn flatten_authority(ca: &CertificateAuthority) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("id".into(), ca.id.clone().into());
    m.insert("arn".into(), ca.id.clone().into());
    m.insert("type".into(), ca.authority_type.as_str().into());
    m.insert("status".into(), ca.status.as_str().into());
    m.insert("enabled".into(), ca.enabled.into());
    m.insert(
        "certificate_authority_configuration".into(),
        block_value(flatten_crypto_config(Some(&ca.crypto_config))),
    );
    m.insert(
        "revocation_configuration".into(),
        block_value(flatten_revocation_config(ca.revocation_config.as_ref())),
    );
    m.insert("certificate".into(), ca.artifacts.certificate.clone().into());
    m.insert(
        "certificate_chain".into(),
        ca.artifacts.certificate_chain.clone().into(),
    );
    m.insert(
        "certificate_signing_request".into(),
        ca.artifacts.certificate_signing_request.clone().into(),
    );
    m.insert(
        "serial".into(),
        ca.artifacts.serial.clone().unwrap_or_default().into(),
    );
    m.insert(
        "not_before".into(),
        ca.artifacts
            .not_before
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
            .into(),
    );
    m.insert(
        "not_after".into(),
        ca.artifacts
            .not_after
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
            .into(),
    );
    let tags = ca
        .tags
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<Map<_, _>>();
    m.insert("tags".into(), Value::Object(tags));
    m
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn block_value(block: Block) -> Value {
    Value::Array(block.into_iter().map(Value::Object).collect())
}

fn nested(m: &Map<String, Value>, key: &str) -> PcaResult<Block> {
    match m.get(key) {
        None | Some(Value::Null) => Ok(Block::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => Ok(obj.clone()),
                other => Err(PcaError::validation(format!(
                    "{key} must contain objects, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(PcaError::validation(format!(
            "{key} must be a list of blocks, got {other}"
        ))),
    }
}

fn string(m: &Map<String, Value>, key: &str) -> Option<String> {
    m.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn required_string(m: &Map<String, Value>, key: &str) -> PcaResult<String> {
    string(m, key).ok_or_else(|| PcaError::validation(format!("{key} is required")))
}

fn optional_u32(m: &Map<String, Value>, key: &str) -> PcaResult<Option<u32>> {
    match m.get(key).and_then(Value::as_u64) {
        None => Ok(None),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| PcaError::validation(format!("{key} out of range: {v}"))),
    }
}

fn tags(m: &Map<String, Value>) -> PcaResult<Tags> {
    match m.get("tags") {
        None | Some(Value::Null) => Ok(Tags::new()),
        Some(Value::Object(obj)) => obj
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(PcaError::validation(format!(
                    "tag {k} must be a string, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(PcaError::validation(format!(
            "tags must be a map, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::authority::{AuthorityArtifacts, AuthorityStatus};

    fn subject() -> Asn1Subject {
        Asn1Subject {
            common_name: Some("pki.example.com".into()),
            country: Some("DE".into()),
            organization: Some("Example".into()),
            surname: Some("Doe".into()),
            ..Default::default()
        }
    }

    fn crypto() -> CryptoConfig {
        CryptoConfig {
            key_algorithm: KeyAlgorithm::EcSecp384r1,
            signing_algorithm: SigningAlgorithm::Sha384WithEcdsa,
            subject: subject(),
        }
    }

    fn as_block(value: Value) -> Block {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(m) => Some(m),
                    _ => None,
                })
                .collect(),
            _ => Block::new(),
        }
    }

    #[test]
    fn subject_round_trip() {
        let s = subject();
        assert_eq!(expand_subject(&flatten_subject(Some(&s))), Some(s));
        assert_eq!(expand_subject(&flatten_subject(None)), None);
    }

    #[test]
    fn validated_subject_survives_round_trip() {
        let full = Asn1Subject {
            common_name: Some("pki.example.com".into()),
            country: Some("DE".into()),
            distinguished_name_qualifier: Some("q1".into()),
            generation_qualifier: Some("Jr".into()),
            given_name: Some("Jane".into()),
            initials: Some("JD".into()),
            locality: Some("Berlin".into()),
            organization: Some("Example".into()),
            organizational_unit: Some("PKI".into()),
            pseudonym: Some("jd".into()),
            state: Some("BE".into()),
            surname: Some("Doe".into()),
            title: Some("CTO".into()),
        };
        full.validate().unwrap();
        assert_eq!(expand_subject(&flatten_subject(Some(&full))), Some(full));

        // An empty string would come back as unset, so it never validates.
        let empty_title = Asn1Subject {
            title: Some(String::new()),
            ..subject()
        };
        assert!(empty_title.validate().is_err());
        assert_eq!(
            expand_subject(&flatten_subject(Some(&empty_title))),
            Some(subject())
        );
    }

    #[test]
    fn validated_crl_survives_round_trip() {
        let crl = CrlConfiguration {
            enabled: false,
            expiration_in_days: 1,
            s3_bucket_name: None,
            custom_cname: Some("crl.example.com".into()),
        };
        crl.validate().unwrap();
        let flat = flatten_crl_config(Some(&crl));
        assert_eq!(expand_crl_config(&flat).unwrap(), Some(crl.clone()));

        let empty_bucket = CrlConfiguration {
            s3_bucket_name: Some(String::new()),
            ..crl
        };
        assert!(empty_bucket.validate().is_err());
    }

    #[test]
    fn default_subject_stays_present() {
        let flat = flatten_subject(Some(&Asn1Subject::default()));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0]["common_name"], json!(""));
        assert_eq!(expand_subject(&flat), Some(Asn1Subject::default()));
    }

    #[test]
    fn empty_strings_expand_to_unset() {
        let block = as_block(json!([{ "common_name": "", "title": "CTO" }]));
        let s = expand_subject(&block).unwrap();
        assert_eq!(s.common_name, None);
        assert_eq!(s.title.as_deref(), Some("CTO"));
    }

    #[test]
    fn crypto_config_round_trip() {
        let c = crypto();
        let flat = flatten_crypto_config(Some(&c));
        assert_eq!(flat[0]["key_algorithm"], json!("EC_secp384r1"));
        assert_eq!(expand_crypto_config(&flat).unwrap(), Some(c));
        assert_eq!(expand_crypto_config(&[]).unwrap(), None);
    }

    #[test]
    fn crypto_config_requires_subject() {
        let block = as_block(json!([{
            "key_algorithm": "RSA_2048",
            "signing_algorithm": "SHA256WITHRSA",
            "subject": []
        }]));
        assert!(matches!(
            expand_crypto_config(&block),
            Err(PcaError::Validation { .. })
        ));
    }

    #[test]
    fn revocation_round_trip_preserves_block_counts() {
        assert!(flatten_revocation_config(None).is_empty());
        assert_eq!(expand_revocation_config(&[]).unwrap(), None);

        let empty = RevocationConfiguration::default();
        let flat = flatten_revocation_config(Some(&empty));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0]["crl_configuration"], json!([]));
        assert_eq!(expand_revocation_config(&flat).unwrap(), Some(empty));

        let full = RevocationConfiguration {
            crl_configuration: Some(CrlConfiguration {
                enabled: true,
                expiration_in_days: 7,
                s3_bucket_name: Some("crl-bucket".into()),
                custom_cname: Some("crl.example.com".into()),
            }),
        };
        let flat = flatten_revocation_config(Some(&full));
        assert_eq!(expand_revocation_config(&flat).unwrap(), Some(full));
    }

    #[test]
    fn crl_expiration_is_required() {
        let block = as_block(json!([{ "enabled": true, "s3_bucket_name": "b" }]));
        assert!(expand_crl_config(&block).is_err());
    }

    #[test]
    fn expand_create_input_reads_flat_config() {
        let flat = json!({
            "type": "ROOT",
            "certificate_authority_configuration": [{
                "key_algorithm": "RSA_4096",
                "signing_algorithm": "SHA512WITHRSA",
                "subject": [{ "common_name": "terraformtesting.com" }]
            }],
            "permanent_deletion_time_in_days": 7,
            "validity_length": 1,
            "validity_unit": "YEARS",
            "tags": { "team": "pki" }
        });
        let input = expand_create_input(flat.as_object().unwrap()).unwrap();
        assert_eq!(input.authority_type, AuthorityType::Root);
        assert_eq!(input.crypto_config.key_algorithm, KeyAlgorithm::Rsa4096);
        assert_eq!(input.revocation_config, None);
        assert_eq!(input.deletion_retention_days, Some(7));
        assert_eq!(input.validity_unit, Some(ValidityUnit::Years));
        assert_eq!(input.tags.get("team").map(String::as_str), Some("pki"));
        assert!(input.validate().unwrap().is_some());
    }

    #[test]
    fn type_defaults_to_subordinate() {
        let flat = json!({
            "certificate_authority_configuration": [{
                "key_algorithm": "RSA_2048",
                "signing_algorithm": "SHA256WITHRSA",
                "subject": [{ "common_name": "sub.example.com" }]
            }]
        });
        let input = expand_create_input(flat.as_object().unwrap()).unwrap();
        assert_eq!(input.authority_type, AuthorityType::Subordinate);
    }

    #[test]
    fn flatten_authority_reports_pending_artifacts_as_empty() {
        let ca = CertificateAuthority {
            id: "arn:example:ca/1".into(),
            authority_type: AuthorityType::Subordinate,
            crypto_config: crypto(),
            revocation_config: None,
            enabled: true,
            status: AuthorityStatus::PendingCertificate,
            artifacts: AuthorityArtifacts::default(),
            tags: Tags::new(),
        };
        let m = flatten_authority(&ca);
        assert_eq!(m["status"], json!("PENDING_CERTIFICATE"));
        assert_eq!(m["certificate"], json!(""));
        assert_eq!(m["revocation_configuration"], json!([]));
        assert_eq!(m["not_after"], json!(""));
    }
}
