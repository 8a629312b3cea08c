//! Public port trait implemented by policy engines.

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::CaziError;
use crate::models::{CheckRequest, CheckResponse, ListObjectsRequest, ListObjectsResponse};

/// Authorization port.
///
/// Implemented by policy engines (in-process or remote) and consumed by
/// resource-owning services acting as PEPs:
///
/// ```ignore
/// let resp = authz.check(&ctx, CheckRequest::new(subject, "read", object)).await?;
/// match resp.decision {
///     DecisionKind::Allow => { /* proceed */ }
///     DecisionKind::Conditional => repo.find_by_id(&ctx, &id, &resp.condition).await?,
///     _ => return Err(Forbidden),
/// }
/// ```
///
/// Implementations must be safe for concurrent use, must honor the
/// [`CallContext`], and must never return [`DecisionKind::Unknown`] in a
/// successful response.
///
/// [`DecisionKind::Unknown`]: crate::DecisionKind::Unknown
#[async_trait]
pub trait AuthorizationPort: Send + Sync {
    /// Decide a single-object request.
    ///
    /// # Errors
    ///
    /// - request-shape errors (see [`CaziError::is_request_shape`])
    /// - `Cancelled` / `DeadlineExceeded` when the context is interrupted
    /// - `ServiceUnavailable` / `Internal` for engine failures
    async fn check(
        &self,
        ctx: &CallContext,
        request: CheckRequest,
    ) -> Result<CheckResponse, CaziError>;

    /// Decide a collection-scoped request, typically answered with a filter.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizationPort::check`].
    async fn list_objects(
        &self,
        ctx: &CallContext,
        request: ListObjectsRequest,
    ) -> Result<ListObjectsResponse, CaziError>;
}
