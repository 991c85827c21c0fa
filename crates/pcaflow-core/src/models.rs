//! Domain models for certificate authority lifecycle management.
//!
//! Wire names (`ROOT`, `PENDING_CERTIFICATE`, `SHA512WITHRSA`, ...) are the
//! provider's; every enumeration converts to and from them through
//! `as_str` / [`std::str::FromStr`].

/// Declares `as_str`, `Display` and `FromStr` for a closed wire enumeration.
macro_rules! wire_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::PcaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($ty::$variant),)+
                    other => Err($crate::error::PcaError::validation(format!(
                        "unknown {}: {other:?}",
                        $label
                    ))),
                }
            }
        }
    };
}

pub mod attachment;
pub mod authority;
pub mod revocation;
pub mod subject;

use crate::error::{PcaError, PcaResult};

/// Checks an optional string field: unset is fine, set must be non-empty
/// and at most `max` bytes long.
pub(crate) fn check_len(field: &str, value: Option<&str>, max: usize) -> PcaResult<()> {
    match value {
        Some("") => Err(PcaError::validation(format!(
            "{field} must not be empty; leave it unset instead"
        ))),
        Some(v) if v.len() > max => Err(PcaError::validation(format!(
            "{field} must be at most {max} bytes, got {}",
            v.len()
        ))),
        _ => Ok(()),
    }
}
