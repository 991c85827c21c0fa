//! Transient-error classification and backoff for the create call.

use std::time::Duration;

use pcaflow_core::error::PcaError;
use rand::Rng;

/// Provider error code of the S3 permission check failure.
pub const VALIDATION_EXCEPTION: &str = "ValidationException";

/// Message fragment of the S3 permission check failure.
pub const S3_PERMISSION_HINT: &str = "Check your S3 bucket permissions and try again";

/// Whether `err` is the provider's S3 bucket permission check failing
/// because a freshly granted bucket policy has not propagated yet.
///
/// The provider exposes no dedicated error code for this case, so the
/// check matches the message text. Replace it with a code comparison if
/// one becomes available.
pub fn is_s3_permission_propagation_delay(err: &PcaError) -> bool {
    matches!(
        err,
        PcaError::Provider { code, message, .. }
            if code == VALIDATION_EXCEPTION && message.contains(S3_PERMISSION_HINT)
    )
}

/// Reclassifies a create failure as [`PcaError::TransientProvider`] when it
/// is known to be recoverable.
pub fn classify_create_error(err: PcaError) -> PcaError {
    if !is_s3_permission_propagation_delay(&err) {
        return err;
    }
    match err {
        PcaError::Provider {
            operation, message, ..
        } => PcaError::TransientProvider { operation, message },
        other => other,
    }
}

/// Turns an exhausted transient error back into a fatal provider error.
pub fn escalate(err: PcaError) -> PcaError {
    match err {
        PcaError::TransientProvider { operation, message } => PcaError::Provider {
            operation,
            code: VALIDATION_EXCEPTION.into(),
            message,
        },
        other => other,
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            current_ms: initial_ms.max(1),
            max_ms: max_ms.max(1),
        }
    }

    /// Next delay: the current backoff plus up to half of it as jitter,
    /// capped at the maximum. Doubles the backoff for the following call.
    pub fn next_delay(&mut self) -> Duration {
        let jitter = rand::rng().random_range(0..(self.current_ms / 2).saturating_add(1));
        let delay = self.current_ms.saturating_add(jitter).min(self.max_ms);
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_error() -> PcaError {
        PcaError::provider(
            "CreateCertificateAuthority",
            VALIDATION_EXCEPTION,
            "The ACM Private CA service account 'acm-pca-prod-pdx' requires getBucketAcl \
             permissions for your S3 bucket 'crl-bucket'. Check your S3 bucket permissions \
             and try again.",
        )
    }

    #[test]
    fn detects_s3_propagation_delay() {
        assert!(is_s3_permission_propagation_delay(&s3_error()));
    }

    #[test]
    fn other_validation_errors_are_not_transient() {
        let err = PcaError::provider(
            "CreateCertificateAuthority",
            VALIDATION_EXCEPTION,
            "Value null at 'expirationInDays' failed to satisfy constraint",
        );
        assert!(!is_s3_permission_propagation_delay(&err));
        assert!(matches!(
            classify_create_error(err),
            PcaError::Provider { .. }
        ));
    }

    #[test]
    fn same_message_with_other_code_is_not_transient() {
        let err = PcaError::provider(
            "CreateCertificateAuthority",
            "AccessDeniedException",
            S3_PERMISSION_HINT,
        );
        assert!(!is_s3_permission_propagation_delay(&err));
    }

    #[test]
    fn classify_then_escalate_restores_provider_error() {
        let transient = classify_create_error(s3_error());
        assert!(matches!(transient, PcaError::TransientProvider { .. }));
        match escalate(transient) {
            PcaError::Provider { code, message, .. } => {
                assert_eq!(code, VALIDATION_EXCEPTION);
                assert!(message.contains(S3_PERMISSION_HINT));
            }
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::new(100, 1_000);
        let first = backoff.next_delay();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        for _ in 0..10 {
            assert!(backoff.next_delay() <= Duration::from_millis(1_000));
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn backoff_saturates_at_large_values() {
        let mut backoff = Backoff::new(u64::MAX, u64::MAX);
        for _ in 0..3 {
            assert!(backoff.next_delay() <= Duration::from_millis(u64::MAX));
        }

        let mut backoff = Backoff::new(u64::MAX / 2 + 1, u64::MAX);
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(u64::MAX));
    }
}
