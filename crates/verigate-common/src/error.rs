//! Common error types for Verigate components.

use thiserror::Error;

use crate::types::FailureNotice;

/// Failures surfaced by the verification pipeline.
///
/// Every component-level failure is caught at its boundary and converted
/// into one of these; nothing escapes uncaught into host code.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single fingerprint probe failed; degrades one field only
    #[error("Probe error: {0}")]
    Probe(String),

    /// Token endpoint unreachable or non-2xx
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// Network-level failure talking to the service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded its abort deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The service rejected the attempt with a verdict
    #[error("Verification rejected ({0})")]
    Rejected(FailureNotice),

    /// Proof-of-work search exhausted its budget or the worker died
    #[error("Challenge search failed: {0}")]
    ChallengeSearch(String),
}

impl SensorError {
    /// Returns true if a fresh attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Diagnostic notice for the failure modal.
    ///
    /// Rejections carry the service-issued identifiers; everything else
    /// renders with `"?"` placeholders.
    pub fn notice(&self) -> FailureNotice {
        match self {
            Self::Rejected(notice) => notice.clone(),
            _ => FailureNotice::unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_diagnostics() {
        let err = SensorError::Rejected(FailureNotice {
            sky_id: Some("SK-1".to_string()),
            score: Some(0.5),
        });
        assert_eq!(err.notice().sky_id_display(), "SK-1");
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable_with_placeholder_notice() {
        let err = SensorError::Transport("connection refused".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.notice().sky_id_display(), "?");
    }
}
