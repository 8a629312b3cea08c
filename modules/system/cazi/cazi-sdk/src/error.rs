//! Error taxonomy for authorization port calls.

use crate::context::Interrupted;

/// Error returned by an [`AuthorizationPort`](crate::AuthorizationPort).
///
/// A port error means "no decision", which callers must treat as a refusal.
/// The first five variants describe a malformed or unsupported request; the
/// rest describe the engine or the call itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaziError {
    /// Subject assertion has the wrong shape or type for this engine.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// Object assertion has the wrong shape or type for this engine.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Verb not known to the policy.
    #[error("unsupported verb: {0}")]
    UnsupportedVerb(String),

    /// Object type not served by the policy.
    #[error("unsupported object type: {0}")]
    UnsupportedObjectType(String),

    /// Caller-side filter cannot be combined with the policy.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// The engine produced a decision that violates the decision invariants.
    #[error("invalid decision: {0}")]
    InvalidDecision(String),

    /// The call was cancelled by the caller.
    #[error("authorization call cancelled")]
    Cancelled,

    /// The call ran past its deadline.
    #[error("authorization call deadline exceeded")]
    DeadlineExceeded,

    /// The engine is not reachable or not ready.
    #[error("authorization service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Unexpected engine failure.
    #[error("internal authorization error: {0}")]
    Internal(String),
}

impl CaziError {
    /// `true` for errors caused by the request rather than the engine.
    #[must_use]
    pub fn is_request_shape(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubject(_)
                | Self::InvalidObject(_)
                | Self::UnsupportedVerb(_)
                | Self::UnsupportedObjectType(_)
                | Self::UnsupportedFilter(_)
        )
    }
}

impl From<Interrupted> for CaziError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn request_shape_classification() {
        assert!(CaziError::InvalidSubject("x".to_owned()).is_request_shape());
        assert!(CaziError::UnsupportedFilter("x".to_owned()).is_request_shape());
        assert!(!CaziError::Cancelled.is_request_shape());
        assert!(!CaziError::Internal("x".to_owned()).is_request_shape());
    }

    #[test]
    fn interruption_maps_to_matching_variant() {
        assert_eq!(CaziError::from(Interrupted::Cancelled), CaziError::Cancelled);
        assert_eq!(
            CaziError::from(Interrupted::DeadlineExceeded),
            CaziError::DeadlineExceeded
        );
    }
}
