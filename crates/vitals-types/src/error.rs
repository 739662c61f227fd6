//! Error taxonomy for sampling and polling.

use crate::time::{Duration, UtcTime};

/// Errors produced while collecting, polling, or retaining samples.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SampleError {
    /// A value failed a domain invariant; nothing was mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A collector or round exceeded its deadline. Retryable.
    #[error("timed out after {elapsed}")]
    Timeout { elapsed: Duration },

    /// A collector reported a failure.
    #[error("collection failed: {message}")]
    Collection { message: String, retryable: bool },

    /// Cooperative cancellation observed at a suspension point.
    ///
    /// Never retried and never downgraded into a snapshot entry; it
    /// always propagates to the cancelling party.
    #[error("cancelled")]
    Cancelled,

    /// Retry budget exhausted; carries the last underlying error.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        last_attempt_at: UtcTime,
        #[source]
        source: Box<SampleError>,
    },
}

impl SampleError {
    /// Shorthand for a retryable collection failure.
    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
            retryable: true,
        }
    }

    /// Shorthand for a failure that must not be retried.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether a poller may retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Collection { retryable, .. } => *retryable,
            Self::Validation(_) | Self::Cancelled | Self::Exhausted { .. } => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<anyhow::Error> for SampleError {
    fn from(err: anyhow::Error) -> Self {
        SampleError::collection(format!("{:#}", err))
    }
}

/// Convenience result type.
pub type SampleResult<T> = std::result::Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(SampleError::Timeout {
            elapsed: Duration::from_millis(50)
        }
        .is_retryable());
        assert!(SampleError::collection("flaky read").is_retryable());
        assert!(!SampleError::fatal("unsupported platform").is_retryable());
        assert!(!SampleError::Cancelled.is_retryable());
        assert!(!SampleError::Validation("negative load".into()).is_retryable());
    }

    #[test]
    fn test_exhausted_display_includes_source() {
        let err = SampleError::Exhausted {
            attempts: 3,
            last_attempt_at: UtcTime::now(),
            source: Box::new(SampleError::collection("io error")),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("io error"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_anyhow() {
        let err: SampleError = anyhow::anyhow!("proc read failed").into();
        match err {
            SampleError::Collection { retryable, message } => {
                assert!(retryable);
                assert!(message.contains("proc read failed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
