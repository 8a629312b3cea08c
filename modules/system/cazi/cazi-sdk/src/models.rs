//! Decision models for the common authorization interface.
//!
//! All types are short-lived values built per request. The core fixes their
//! shape and invariants, not a wire encoding; `serde` derives exist so that
//! out-of-process port implementations can carry them over any transport.

use std::fmt;

use cazi_claims::Claims;
use serde::{Deserialize, Serialize};

use crate::error::CaziError;

/// Well-known expression language identifiers.
pub mod languages {
    /// Common Expression Language.
    pub const CEL: &str = "cel";
}

/// A closed set of ways to identify or describe a subject or an object.
///
/// Exactly one variant is populated at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// Arbitrary structured claims.
    Claims(Claims),
    /// An uninterpreted token, e.g. a signed JWT.
    OpaqueToken(OpaqueToken),
    /// A typed identifier.
    ResourceReference(ResourceReference),
}

impl Assertion {
    /// The resource reference, if this assertion is one.
    #[must_use]
    pub fn as_resource_reference(&self) -> Option<&ResourceReference> {
        match self {
            Self::ResourceReference(r) => Some(r),
            Self::Claims(_) | Self::OpaqueToken(_) => None,
        }
    }

    /// Short variant name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Claims(_) => "claims",
            Self::OpaqueToken(_) => "opaque_token",
            Self::ResourceReference(_) => "resource_reference",
        }
    }
}

/// Opaque payload with a declared type (e.g. `"jwt"`).
///
/// `Debug` never prints the raw bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueToken {
    /// Media type or scheme identifier.
    pub token_type: String,
    /// Raw token bytes.
    pub raw: Vec<u8>,
}

impl OpaqueToken {
    /// Token of the given type carrying `raw` bytes.
    #[must_use]
    pub fn new(token_type: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            token_type: token_type.into(),
            raw: raw.into(),
        }
    }
}

impl fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueToken")
            .field("token_type", &self.token_type)
            .field("raw", &format_args!("<{} bytes redacted>", self.raw.len()))
            .finish()
    }
}

/// A resource identified by type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Resource type (e.g. `"user"`, `"widget"`).
    pub resource_type: String,
    /// Resource identifier within its type.
    pub id: String,
}

impl ResourceReference {
    /// Reference to resource `id` of `resource_type`.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// The acting principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Assertion about the subject.
    pub assertion: Assertion,
    /// Optional named relation (e.g. `"member"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl Subject {
    /// Subject described by `assertion`, with no relation.
    #[must_use]
    pub fn new(assertion: Assertion) -> Self {
        Self {
            assertion,
            relation: None,
        }
    }

    /// Subject identified by a [`ResourceReference`].
    #[must_use]
    pub fn resource(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(Assertion::ResourceReference(ResourceReference::new(
            resource_type,
            id,
        )))
    }

    /// Set the subject relation.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }
}

/// The target of the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Assertion about the object.
    pub assertion: Assertion,
}

impl Object {
    /// Object described by `assertion`.
    #[must_use]
    pub fn new(assertion: Assertion) -> Self {
        Self { assertion }
    }

    /// Object identified by a [`ResourceReference`].
    #[must_use]
    pub fn resource(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(Assertion::ResourceReference(ResourceReference::new(
            resource_type,
            id,
        )))
    }
}

/// Opaque causal-consistency hint ("at least as fresh as").
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsistencyToken(pub Vec<u8>);

impl ConsistencyToken {
    /// Wrap an opaque revision marker.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A condition the caller evaluates against its own data.
///
/// The language is not fixed by the interface; callers and policy engines
/// agree on one (e.g. `"cel"`). An empty `language` means "no expression",
/// which is also the [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expression {
    /// Expression language identifier; empty when no expression is set.
    pub language: String,
    /// Expression source text.
    pub source: String,
}

impl Expression {
    /// Expression in `language`. An empty language means no expression.
    #[must_use]
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
        }
    }

    /// The "no filter required" expression.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A CEL expression.
    #[must_use]
    pub fn cel(source: impl Into<String>) -> Self {
        Self::new(languages::CEL, source)
    }

    /// Returns `true` when no expression is set (empty language).
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.language.is_empty()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            write!(f, "{}: {}", self.language, self.source)
        }
    }
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Unspecified. Never a legal final decision.
    #[default]
    Unknown,
    /// Proceed unconditionally.
    Allow,
    /// Refuse without consulting storage.
    Deny,
    /// Proceed only for data satisfying the returned condition.
    Conditional,
}

impl DecisionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Conditional => "conditional",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional additional information returned alongside a decision.
///
/// Modelled on the transaction token draft: claims about the requester and
/// claims about the requested operation. Either bag may be absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthorizationContext {
    /// Claims about who is making the request (ids, roles, attributes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_context: Option<Claims>,
    /// Claims about the operation itself (environment, computed context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_context: Option<Claims>,
}

/// Single-object authorization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub subject: Subject,
    /// Policy-defined verb or relation.
    pub verb: String,
    pub object: Object,
    /// Optional causal-consistency hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_token: Option<ConsistencyToken>,
}

impl CheckRequest {
    /// Ask whether `subject` may `verb` on `object`, with no consistency hint.
    #[must_use]
    pub fn new(subject: Subject, verb: impl Into<String>, object: Object) -> Self {
        Self {
            subject,
            verb: verb.into(),
            object,
            consistency_token: None,
        }
    }

    /// Ask for a decision at least as fresh as `token`.
    #[must_use]
    pub fn at_least_as_fresh(mut self, token: ConsistencyToken) -> Self {
        self.consistency_token = Some(token);
        self
    }
}

/// Outcome of a [`CheckRequest`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckResponse {
    pub decision: DecisionKind,
    /// Meaningful only when `decision` is [`DecisionKind::Conditional`].
    #[serde(default)]
    pub condition: Expression,
    #[serde(default)]
    pub context: AuthorizationContext,
}

impl CheckResponse {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            decision: DecisionKind::Allow,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deny() -> Self {
        Self {
            decision: DecisionKind::Deny,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn conditional(condition: Expression) -> Self {
        Self {
            decision: DecisionKind::Conditional,
            condition,
            context: AuthorizationContext::default(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: AuthorizationContext) -> Self {
        self.context = context;
        self
    }

    /// Check the decision invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CaziError::InvalidDecision`] when the decision is `Unknown`,
    /// when a `Conditional` decision has no expression language, or when an
    /// `Allow`/`Deny` decision carries a condition.
    pub fn validate(&self) -> Result<(), CaziError> {
        validate_decision(self.decision, &self.condition)
    }
}

/// Collection-scoped authorization request for a whole object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListObjectsRequest {
    pub subject: Subject,
    /// Policy-defined verb or relation.
    pub verb: String,
    /// Type of the objects being listed.
    pub object_type: String,
    /// Optional caller-side filter to narrow the listing.
    #[serde(default)]
    pub filter: Expression,
    /// Optional causal-consistency hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_token: Option<ConsistencyToken>,
}

impl ListObjectsRequest {
    /// Ask which objects of `object_type` `subject` may `verb`, with no caller
    /// filter and no consistency hint.
    #[must_use]
    pub fn new(subject: Subject, verb: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            subject,
            verb: verb.into(),
            object_type: object_type.into(),
            filter: Expression::none(),
            consistency_token: None,
        }
    }

    /// Narrow the listing with a caller-side filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = filter;
        self
    }

    /// Ask for a decision at least as fresh as `token`.
    #[must_use]
    pub fn at_least_as_fresh(mut self, token: ConsistencyToken) -> Self {
        self.consistency_token = Some(token);
        self
    }
}

/// Outcome of a [`ListObjectsRequest`].
///
/// Instead of a list of identifiers this carries one filter expression to be
/// applied to every candidate, e.g. `owner_id == 'user123'`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    pub decision: DecisionKind,
    /// Filter to apply; meaningful only when `decision` is `Conditional`.
    #[serde(default)]
    pub condition: Expression,
    #[serde(default)]
    pub context: AuthorizationContext,
}

impl ListObjectsResponse {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            decision: DecisionKind::Allow,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deny() -> Self {
        Self {
            decision: DecisionKind::Deny,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn conditional(condition: Expression) -> Self {
        Self {
            decision: DecisionKind::Conditional,
            condition,
            context: AuthorizationContext::default(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: AuthorizationContext) -> Self {
        self.context = context;
        self
    }

    /// Check the decision invariants.
    ///
    /// # Errors
    ///
    /// Same rules as [`CheckResponse::validate`].
    pub fn validate(&self) -> Result<(), CaziError> {
        validate_decision(self.decision, &self.condition)
    }
}

fn validate_decision(decision: DecisionKind, condition: &Expression) -> Result<(), CaziError> {
    match decision {
        DecisionKind::Unknown => Err(CaziError::InvalidDecision(
            "decision was left unknown".to_owned(),
        )),
        DecisionKind::Conditional if condition.is_none() => Err(CaziError::InvalidDecision(
            "conditional decision carries no expression language".to_owned(),
        )),
        DecisionKind::Allow | DecisionKind::Deny if *condition != Expression::none() => {
            Err(CaziError::InvalidDecision(format!(
                "{decision} decision must not carry a condition"
            )))
        }
        DecisionKind::Allow | DecisionKind::Deny | DecisionKind::Conditional => Ok(()),
    }
}
