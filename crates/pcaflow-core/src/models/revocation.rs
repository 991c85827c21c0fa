//! Revocation (CRL) configuration of a certificate authority.
//!
//! Unlike the crypto configuration, this block stays mutable after
//! creation and is sent again through the combined update call.

use serde::{Deserialize, Serialize};

use super::check_len;
use crate::error::{PcaError, PcaResult};

pub const CRL_EXPIRATION_DAYS_MIN: u32 = 1;
pub const CRL_EXPIRATION_DAYS_MAX: u32 = 5000;
const CUSTOM_CNAME_MAX: usize = 253;
const S3_BUCKET_NAME_MAX: usize = 255;

/// Certificate revocation list publication settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrlConfiguration {
    pub enabled: bool,
    /// Validity of each published CRL, in days (1..=5000).
    pub expiration_in_days: u32,
    /// Bucket the CRL is published to.
    pub s3_bucket_name: Option<String>,
    /// DNS alias that replaces the bucket name in CRL distribution points.
    pub custom_cname: Option<String>,
}

impl CrlConfiguration {
    pub fn validate(&self) -> PcaResult<()> {
        if !(CRL_EXPIRATION_DAYS_MIN..=CRL_EXPIRATION_DAYS_MAX).contains(&self.expiration_in_days) {
            return Err(PcaError::validation(format!(
                "crl_configuration.expiration_in_days must be between \
                 {CRL_EXPIRATION_DAYS_MIN} and {CRL_EXPIRATION_DAYS_MAX}, got {}",
                self.expiration_in_days
            )));
        }
        check_len(
            "crl_configuration.custom_cname",
            self.custom_cname.as_deref(),
            CUSTOM_CNAME_MAX,
        )?;
        check_len(
            "crl_configuration.s3_bucket_name",
            self.s3_bucket_name.as_deref(),
            S3_BUCKET_NAME_MAX,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevocationConfiguration {
    pub crl_configuration: Option<CrlConfiguration>,
}

impl RevocationConfiguration {
    pub fn validate(&self) -> PcaResult<()> {
        match &self.crl_configuration {
            Some(crl) => crl.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crl(days: u32) -> CrlConfiguration {
        CrlConfiguration {
            enabled: true,
            expiration_in_days: days,
            s3_bucket_name: Some("crl-bucket".into()),
            custom_cname: None,
        }
    }

    #[test]
    fn expiration_bounds() {
        assert!(crl(0).validate().is_err());
        assert!(crl(1).validate().is_ok());
        assert!(crl(5000).validate().is_ok());
        assert!(crl(5001).validate().is_err());
    }

    #[test]
    fn long_cname_is_rejected() {
        let config = RevocationConfiguration {
            crl_configuration: Some(CrlConfiguration {
                custom_cname: Some("c".repeat(254)),
                ..crl(7)
            }),
        };
        assert!(matches!(
            config.validate(),
            Err(PcaError::Validation { .. })
        ));
    }

    #[test]
    fn empty_revocation_block_is_valid() {
        assert!(RevocationConfiguration::default().validate().is_ok());
    }

    #[test]
    fn empty_bucket_name_is_rejected() {
        let config = CrlConfiguration {
            s3_bucket_name: Some(String::new()),
            ..crl(7)
        };
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string()
                .contains("crl_configuration.s3_bucket_name must not be empty")
        );

        let config = CrlConfiguration {
            custom_cname: Some(String::new()),
            ..crl(7)
        };
        assert!(config.validate().is_err());
    }
}
