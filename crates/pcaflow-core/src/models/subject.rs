//! X.500 distinguished name of a certificate authority.

use serde::{Deserialize, Serialize};

use super::check_len;
use crate::error::PcaResult;

/// ASN.1 subject of the CA certificate.
///
/// Every field is optional. `None` means "not set". An empty string is not
/// a valid value: [`Asn1Subject::validate`] rejects it, since the flat
/// representation cannot tell it apart from an unset field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asn1Subject {
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub distinguished_name_qualifier: Option<String>,
    pub generation_qualifier: Option<String>,
    pub given_name: Option<String>,
    pub initials: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub pseudonym: Option<String>,
    pub state: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
}

impl Asn1Subject {
    /// Field name, value and maximum length in bytes, in canonical order.
    pub fn bounded_fields(&self) -> [(&'static str, Option<&str>, usize); 13] {
        [
            ("common_name", self.common_name.as_deref(), 64),
            ("country", self.country.as_deref(), 2),
            (
                "distinguished_name_qualifier",
                self.distinguished_name_qualifier.as_deref(),
                64,
            ),
            ("generation_qualifier", self.generation_qualifier.as_deref(), 3),
            ("given_name", self.given_name.as_deref(), 16),
            ("initials", self.initials.as_deref(), 5),
            ("locality", self.locality.as_deref(), 128),
            ("organization", self.organization.as_deref(), 64),
            ("organizational_unit", self.organizational_unit.as_deref(), 64),
            ("pseudonym", self.pseudonym.as_deref(), 128),
            ("state", self.state.as_deref(), 128),
            ("surname", self.surname.as_deref(), 40),
            ("title", self.title.as_deref(), 64),
        ]
    }

    pub fn validate(&self) -> PcaResult<()> {
        for (name, value, max) in self.bounded_fields() {
            check_len(&format!("subject.{name}"), value, max)?;
        }
        Ok(())
    }

    /// Renders the subject as an RFC 4514-style string, e.g.
    /// `CN=example.com,O=Example`. Attributes without a registered short
    /// name use their X.520 attribute type name.
    pub fn distinguished_name(&self) -> String {
        let parts = [
            ("CN", &self.common_name),
            ("OU", &self.organizational_unit),
            ("O", &self.organization),
            ("L", &self.locality),
            ("ST", &self.state),
            ("C", &self.country),
            ("T", &self.title),
            ("SN", &self.surname),
            ("GN", &self.given_name),
            ("initials", &self.initials),
            ("generationQualifier", &self.generation_qualifier),
            ("dnQualifier", &self.distinguished_name_qualifier),
            ("pseudonym", &self.pseudonym),
        ];
        parts
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}
