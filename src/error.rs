//! Error types for the circuit breaker

use std::time::Duration;

use thiserror::Error;
use tower::BoxError;

/// Result type alias for guarded calls
pub type Result<T> = std::result::Result<T, BreakerError>;

/// Failure surfaced by a guarded call.
///
/// Every variant other than [`BreakerError::Dependency`] is produced by a
/// strategy before or instead of invoking the callee. Strategies that do not
/// recognize a failure re-raise it unchanged; only caching (fallback value)
/// and retry (successful retry) may convert a failure into a success.
#[derive(Debug, Error)]
pub enum BreakerError {
    /// The callee itself failed; carries the original failure
    #[error("dependency failure: {0}")]
    Dependency(#[source] BoxError),

    /// Rejected before calling the callee: too many calls in flight
    #[error("concurrency limit exceeded: {current} calls in flight (limit {limit})")]
    ConcurrencyLimitExceeded { current: usize, limit: usize },

    /// Rejected by fast-fail while the circuit is open
    #[error("circuit open")]
    CircuitOpen,

    /// Rejected before calling the callee: rate cap reached for the period
    #[error("throttle exceeded: {cap} calls per {period:?}")]
    ThrottleExceeded { cap: usize, period: Duration },

    /// The callee did not complete within the window; its eventual outcome,
    /// if any, is discarded by this layer
    #[error("call timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl BreakerError {
    /// True when the call was rejected without the callee ever running.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BreakerError::ConcurrencyLimitExceeded { .. }
                | BreakerError::CircuitOpen
                | BreakerError::ThrottleExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BreakerError::ConcurrencyLimitExceeded {
            current: 4,
            limit: 4,
        };
        assert_eq!(
            err.to_string(),
            "concurrency limit exceeded: 4 calls in flight (limit 4)"
        );

        let err = BreakerError::CircuitOpen;
        assert_eq!(err.to_string(), "circuit open");

        let err = BreakerError::Timeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "call timed out after 250ms");
    }

    #[test]
    fn test_dependency_source_preserved() {
        let inner: BoxError = "connection reset".into();
        let err = BreakerError::Dependency(inner);
        assert!(err.to_string().contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_rejection_classification() {
        assert!(BreakerError::CircuitOpen.is_rejection());
        assert!(BreakerError::ThrottleExceeded {
            cap: 1,
            period: Duration::from_secs(1)
        }
        .is_rejection());
        assert!(!BreakerError::Dependency("boom".into()).is_rejection());
        assert!(!BreakerError::Timeout {
            timeout: Duration::from_secs(1)
        }
        .is_rejection());
    }
}
