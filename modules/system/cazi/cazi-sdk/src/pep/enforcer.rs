//! Policy Enforcement Point (`PEP`) object.
//!
//! [`PolicyEnforcer`] encapsulates the full PEP flow:
//! build request → call the port → compile the decision to a filter.
//!
//! Constructed once during service initialisation with the port. The
//! resulting [`AccessGrant`] carries the filter the caller must pass,
//! unchanged, to the repository.

use std::sync::Arc;

use crate::api::AuthorizationPort;
use crate::context::CallContext;
use crate::error::CaziError;
use crate::models::{
    AuthorizationContext, CheckRequest, Expression, ListObjectsRequest, Object, Subject,
};
use crate::pep::compiler::{DecisionCompileError, compile_decision};

/// Error from the PEP enforcement flow.
///
/// Either the port call failed ([`CaziError`]) or the decision refused
/// access ([`DecisionCompileError`]).
#[derive(Debug, thiserror::Error)]
pub enum EnforcerError {
    /// The authorization call itself failed.
    #[error("authorization evaluation failed: {0}")]
    EvaluationFailed(#[from] CaziError),

    /// The decision was deny, undecided, or malformed.
    #[error("decision compilation failed: {0}")]
    CompileFailed(#[from] DecisionCompileError),
}

impl EnforcerError {
    /// `true` when the policy explicitly denied access.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::CompileFailed(DecisionCompileError::Denied))
    }
}

/// Permission to proceed, possibly restricted by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGrant {
    filter: Expression,
    context: AuthorizationContext,
}

impl AccessGrant {
    /// Filter to AND into the storage query. Empty for an unconditional allow.
    #[must_use]
    pub fn filter(&self) -> &Expression {
        &self.filter
    }

    /// Context returned by the engine alongside the decision.
    #[must_use]
    pub fn context(&self) -> &AuthorizationContext {
        &self.context
    }

    /// `true` when storage needs no additional predicate.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.filter.is_none()
    }

    #[must_use]
    pub fn into_parts(self) -> (Expression, AuthorizationContext) {
        (self.filter, self.context)
    }
}

/// Policy Enforcement Point.
///
/// Cloneable and cheap to pass around (`Arc` inside).
///
/// # Example
///
/// ```ignore
/// let enforcer = PolicyEnforcer::new(authz.clone());
///
/// let grant = enforcer
///     .authorize(&ctx, Subject::resource("user", "alice"), "read", Object::resource("widget", "w1"))
///     .await?;
/// let widget = repo.find_by_id(&ctx, &id, grant.filter()).await?;
/// ```
#[derive(Clone)]
pub struct PolicyEnforcer {
    authz: Arc<dyn AuthorizationPort>,
}

impl PolicyEnforcer {
    /// Create a new enforcer.
    #[must_use]
    pub fn new(authz: Arc<dyn AuthorizationPort>) -> Self {
        Self { authz }
    }

    /// Single-object flow: `check` then compile.
    ///
    /// # Errors
    ///
    /// - [`EnforcerError::EvaluationFailed`] if the port call fails
    /// - [`EnforcerError::CompileFailed`] if the decision refuses access
    #[tracing::instrument(skip(self, ctx, subject, object), fields(verb = %verb))]
    pub async fn authorize(
        &self,
        ctx: &CallContext,
        subject: Subject,
        verb: &str,
        object: Object,
    ) -> Result<AccessGrant, EnforcerError> {
        self.authorize_request(ctx, CheckRequest::new(subject, verb, object))
            .await
    }

    /// Single-object flow for a fully built request (e.g. with a consistency token).
    ///
    /// # Errors
    ///
    /// Same as [`PolicyEnforcer::authorize`].
    pub async fn authorize_request(
        &self,
        ctx: &CallContext,
        request: CheckRequest,
    ) -> Result<AccessGrant, EnforcerError> {
        let response = self.authz.check(ctx, request).await?;
        let filter = compile_decision(response.decision, &response.condition)?;
        tracing::debug!(decision = %response.decision, filter = %filter, "check decision compiled");
        Ok(AccessGrant {
            filter,
            context: response.context,
        })
    }

    /// Collection flow: `list_objects` then compile.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyEnforcer::authorize`].
    #[tracing::instrument(skip(self, ctx, subject), fields(verb = %verb, object_type = %object_type))]
    pub async fn authorize_list(
        &self,
        ctx: &CallContext,
        subject: Subject,
        verb: &str,
        object_type: &str,
    ) -> Result<AccessGrant, EnforcerError> {
        self.authorize_list_request(ctx, ListObjectsRequest::new(subject, verb, object_type))
            .await
    }

    /// Collection flow for a fully built request (e.g. with a caller filter).
    ///
    /// # Errors
    ///
    /// Same as [`PolicyEnforcer::authorize`].
    pub async fn authorize_list_request(
        &self,
        ctx: &CallContext,
        request: ListObjectsRequest,
    ) -> Result<AccessGrant, EnforcerError> {
        let response = self.authz.list_objects(ctx, request).await?;
        let filter = compile_decision(response.decision, &response.condition)?;
        tracing::debug!(decision = %response.decision, filter = %filter, "list decision compiled");
        Ok(AccessGrant {
            filter,
            context: response.context,
        })
    }
}

impl std::fmt::Debug for PolicyEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEnforcer").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use async_trait::async_trait;
    use cazi_claims::Claims;
    use serde_json::json;

    use super::*;
    use crate::models::{CheckResponse, DecisionKind, ListObjectsResponse};

    /// Mock returning a fixed decision for every call.
    struct FixedMock {
        decision: DecisionKind,
        condition: Expression,
    }

    #[async_trait]
    impl AuthorizationPort for FixedMock {
        async fn check(
            &self,
            _ctx: &CallContext,
            _request: CheckRequest,
        ) -> Result<CheckResponse, CaziError> {
            let mut requester = Claims::new();
            requester.insert("sub".to_owned(), json!("alice"));
            Ok(CheckResponse {
                decision: self.decision,
                condition: self.condition.clone(),
                context: AuthorizationContext {
                    requester_context: Some(requester),
                    transaction_context: None,
                },
            })
        }

        async fn list_objects(
            &self,
            _ctx: &CallContext,
            _request: ListObjectsRequest,
        ) -> Result<ListObjectsResponse, CaziError> {
            Ok(ListObjectsResponse {
                decision: self.decision,
                condition: self.condition.clone(),
                context: AuthorizationContext::default(),
            })
        }
    }

    /// Mock that always fails.
    struct FailMock;

    #[async_trait]
    impl AuthorizationPort for FailMock {
        async fn check(
            &self,
            _ctx: &CallContext,
            _request: CheckRequest,
        ) -> Result<CheckResponse, CaziError> {
            Err(CaziError::ServiceUnavailable("engine down".to_owned()))
        }

        async fn list_objects(
            &self,
            _ctx: &CallContext,
            _request: ListObjectsRequest,
        ) -> Result<ListObjectsResponse, CaziError> {
            Err(CaziError::Internal("boom".to_owned()))
        }
    }

    fn enforcer(mock: impl AuthorizationPort + 'static) -> PolicyEnforcer {
        PolicyEnforcer::new(Arc::new(mock))
    }

    fn fixed(decision: DecisionKind, condition: Expression) -> PolicyEnforcer {
        enforcer(FixedMock {
            decision,
            condition,
        })
    }

    async fn read_widget(e: &PolicyEnforcer) -> Result<AccessGrant, EnforcerError> {
        e.authorize(
            &CallContext::new(),
            Subject::resource("user", "alice"),
            "read",
            Object::resource("widget", "w1"),
        )
        .await
    }

    // ── authorize ────────────────────────────────────────────────────

    #[tokio::test]
    async fn allow_grants_unrestricted_access() {
        let grant = read_widget(&fixed(DecisionKind::Allow, Expression::none()))
            .await
            .expect("should succeed");

        assert!(grant.is_unrestricted());
        assert_eq!(
            grant
                .context()
                .requester_context
                .as_ref()
                .and_then(|c| c.get("sub")),
            Some(&json!("alice"))
        );
    }

    #[tokio::test]
    async fn conditional_grants_filter_unchanged() {
        let condition = Expression::cel("widget.owner_id == 'alice'");
        let grant = read_widget(&fixed(DecisionKind::Conditional, condition.clone()))
            .await
            .expect("should succeed");

        assert!(!grant.is_unrestricted());
        assert_eq!(grant.filter(), &condition);
    }

    #[tokio::test]
    async fn deny_is_compile_failure() {
        let result = read_widget(&fixed(DecisionKind::Deny, Expression::none())).await;

        let err = result.expect_err("should deny");
        assert!(err.is_denied());
    }

    #[tokio::test]
    async fn unknown_fails_closed() {
        let result = read_widget(&fixed(DecisionKind::Unknown, Expression::none())).await;

        assert!(matches!(
            result,
            Err(EnforcerError::CompileFailed(DecisionCompileError::Undecided))
        ));
    }

    #[tokio::test]
    async fn evaluation_failure_is_not_a_denial() {
        let result = read_widget(&enforcer(FailMock)).await;

        let err = result.expect_err("should fail");
        assert!(matches!(
            err,
            EnforcerError::EvaluationFailed(CaziError::ServiceUnavailable(_))
        ));
        assert!(!err.is_denied());
    }

    // ── authorize_list ───────────────────────────────────────────────

    #[tokio::test]
    async fn list_conditional_returns_filter() {
        let condition = Expression::cel("owner_id == 'alice'");
        let e = fixed(DecisionKind::Conditional, condition.clone());
        let (filter, _) = e
            .authorize_list(
                &CallContext::new(),
                Subject::resource("user", "alice"),
                "read",
                "widget",
            )
            .await
            .expect("should succeed")
            .into_parts();

        assert_eq!(filter, condition);
    }

    #[tokio::test]
    async fn list_evaluation_failure() {
        let result = enforcer(FailMock)
            .authorize_list(
                &CallContext::new(),
                Subject::resource("user", "alice"),
                "read",
                "widget",
            )
            .await;

        assert!(matches!(result, Err(EnforcerError::EvaluationFailed(_))));
    }

    #[test]
    fn debug_impl() {
        let e = enforcer(FailMock);
        let dbg = format!("{e:?}");
        assert!(dbg.contains("PolicyEnforcer"));
    }
}
