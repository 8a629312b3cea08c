use cazi_sdk::CaziError;
use cazi_sdk::pep::{DecisionCompileError, EnforcerError};
use cazi_sdk::repository::RepositoryError;

/// Errors surfaced by [`WidgetService`](super::service::WidgetService).
///
/// `NotFound` is returned both for missing widgets and for widgets the
/// caller may not see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("access denied")]
    Forbidden,

    #[error("widget not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage cannot honor the authorization filter.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("authorization service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EnforcerError> for DomainError {
    fn from(e: EnforcerError) -> Self {
        match e {
            EnforcerError::CompileFailed(DecisionCompileError::Denied) => Self::Forbidden,
            EnforcerError::CompileFailed(
                reason @ (DecisionCompileError::MissingCondition | DecisionCompileError::Undecided),
            ) => {
                tracing::error!(error = %reason, "malformed authorization decision, refusing");
                Self::Forbidden
            }
            EnforcerError::EvaluationFailed(e) if e.is_request_shape() => {
                Self::BadRequest(e.to_string())
            }
            EnforcerError::EvaluationFailed(CaziError::Cancelled | CaziError::DeadlineExceeded) => {
                Self::Cancelled
            }
            EnforcerError::EvaluationFailed(CaziError::ServiceUnavailable(msg)) => {
                Self::Unavailable(msg)
            }
            EnforcerError::EvaluationFailed(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<RepositoryError> for DomainError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::UnsupportedLanguage { language } => Self::Unsupported(format!(
                "filter language `{language}` is not supported by storage"
            )),
            RepositoryError::InvalidSelection(msg) => {
                Self::BadRequest(format!("invalid filter: {msg}"))
            }
            RepositoryError::Cancelled | RepositoryError::DeadlineExceeded => Self::Cancelled,
            RepositoryError::InvalidExpression(msg) | RepositoryError::Storage(msg) => {
                Self::Internal(msg)
            }
        }
    }
}
