//! Service implementation for the static CAZI plugin.

use cazi_claims::{Claim, Claims, StandardClaims};
use cazi_sdk::{
    AuthorizationContext, CaziError, CheckRequest, CheckResponse, Expression, ListObjectsRequest,
    ListObjectsResponse, Subject,
};

use crate::config::{ConfigError, PolicyMode, StaticCaziPluginConfig};

/// How a verb is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Allow,
    Owner,
    Deny,
}

/// Static CAZI service.
///
/// In `ownership` mode:
/// - verbs in `allow_verbs` → `Allow`
/// - verbs in `owner_verbs` → `Conditional` on `<owner_property> == '<subject id>'`
/// - verbs in `deny_verbs` → `Deny`
/// - anything else → `UnsupportedVerb`
///
/// In `allow_all` mode every well-formed request is allowed.
///
/// Subjects and objects must be resource references of the configured
/// types. The policy is immutable, so every decision is trivially at least as
/// fresh as any consistency token and the token is ignored.
#[derive(Debug, Clone)]
pub struct Service {
    config: StaticCaziPluginConfig,
    standard: StandardClaims,
    verb_claim: Claim<String>,
    object_type_claim: Claim<String>,
}

impl Service {
    /// Build the service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is inconsistent.
    pub fn new(config: StaticCaziPluginConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            standard: StandardClaims::new(),
            verb_claim: Claim::top_level("verb"),
            object_type_claim: Claim::top_level("object_type"),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StaticCaziPluginConfig {
        &self.config
    }

    /// Decide a single-object request.
    ///
    /// # Errors
    ///
    /// Request-shape errors for a malformed subject or object, or an
    /// unrecognised verb.
    pub fn check(&self, request: &CheckRequest) -> Result<CheckResponse, CaziError> {
        let subject_id = self.subject_id(&request.subject)?;

        let object = request.object.assertion.as_resource_reference().ok_or_else(|| {
            CaziError::InvalidObject(format!(
                "expected a resource reference, got {}",
                request.object.assertion.kind()
            ))
        })?;
        if object.resource_type != self.config.object_type {
            return Err(CaziError::InvalidObject(format!(
                "expected object type `{}`, got `{}`",
                self.config.object_type, object.resource_type
            )));
        }

        let response = match self.rule(&request.verb)? {
            Rule::Allow => CheckResponse::allow(),
            Rule::Owner => CheckResponse::conditional(self.owner_filter(subject_id)),
            Rule::Deny => CheckResponse::deny(),
        };
        tracing::debug!(
            subject = subject_id,
            verb = %request.verb,
            object_id = %object.id,
            decision = %response.decision,
            "static policy check"
        );

        Ok(response.with_context(self.context(subject_id, &request.verb)))
    }

    /// Decide a collection request.
    ///
    /// A caller filter is only vetted for its language. It is never spliced
    /// into the returned condition: the repository applies it as a separate
    /// selection predicate, so it can narrow the result but never widen it.
    ///
    /// # Errors
    ///
    /// Request-shape errors for a malformed subject, a foreign object type, a
    /// caller filter in another language, or an unrecognised verb.
    pub fn list_objects(
        &self,
        request: &ListObjectsRequest,
    ) -> Result<ListObjectsResponse, CaziError> {
        let subject_id = self.subject_id(&request.subject)?;

        if request.object_type != self.config.object_type {
            return Err(CaziError::UnsupportedObjectType(request.object_type.clone()));
        }
        if !request.filter.is_none() && request.filter.language != self.config.language {
            return Err(CaziError::UnsupportedFilter(format!(
                "filter language `{}` cannot be combined with `{}`",
                request.filter.language, self.config.language
            )));
        }

        let response = match self.rule(&request.verb)? {
            Rule::Allow => ListObjectsResponse::allow(),
            Rule::Owner => ListObjectsResponse::conditional(self.owner_filter(subject_id)),
            Rule::Deny => ListObjectsResponse::deny(),
        };
        tracing::debug!(
            subject = subject_id,
            verb = %request.verb,
            object_type = %request.object_type,
            decision = %response.decision,
            "static policy list"
        );

        Ok(response.with_context(self.context(subject_id, &request.verb)))
    }

    fn subject_id<'a>(&self, subject: &'a Subject) -> Result<&'a str, CaziError> {
        let reference = subject.assertion.as_resource_reference().ok_or_else(|| {
            CaziError::InvalidSubject(format!(
                "expected a resource reference, got {}",
                subject.assertion.kind()
            ))
        })?;
        if reference.resource_type != self.config.subject_type {
            return Err(CaziError::InvalidSubject(format!(
                "expected subject type `{}`, got `{}`",
                self.config.subject_type, reference.resource_type
            )));
        }
        if reference.id.is_empty() {
            return Err(CaziError::InvalidSubject("subject id is empty".to_owned()));
        }
        Ok(&reference.id)
    }

    fn rule(&self, verb: &str) -> Result<Rule, CaziError> {
        let listed = |verbs: &[String]| verbs.iter().any(|v| v == verb);

        if self.config.mode == PolicyMode::AllowAll {
            return Ok(Rule::Allow);
        }
        if listed(&self.config.allow_verbs) {
            Ok(Rule::Allow)
        } else if listed(&self.config.owner_verbs) {
            Ok(Rule::Owner)
        } else if listed(&self.config.deny_verbs) {
            Ok(Rule::Deny)
        } else {
            Err(CaziError::UnsupportedVerb(verb.to_owned()))
        }
    }

    fn owner_filter(&self, subject_id: &str) -> Expression {
        let property = match &self.config.binding {
            Some(binding) => format!("{binding}.{}", self.config.owner_property),
            None => self.config.owner_property.clone(),
        };
        Expression::new(
            self.config.language.clone(),
            format!("{property} == {}", string_literal(subject_id)),
        )
    }

    fn context(&self, subject_id: &str, verb: &str) -> AuthorizationContext {
        let mut requester = Claims::new();
        self.standard.sub.set(&mut requester, subject_id.to_owned());

        let mut transaction = Claims::new();
        self.verb_claim.set(&mut transaction, verb.to_owned());
        self.object_type_claim
            .set(&mut transaction, self.config.object_type.clone());

        AuthorizationContext {
            requester_context: Some(requester),
            transaction_context: Some(transaction),
        }
    }
}

/// Quote `value` as a single-quoted string literal, escaping anything that
/// could end the literal early.
#[must_use]
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
