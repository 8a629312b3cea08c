//! Contracts for repositories that receive delegated filter expressions.
//!
//! A conditional decision is not resolved at the authorization boundary.
//! The PEP hands its [`Expression`] unchanged to the repository, which ANDs
//! it with the identity or selection predicate of the query:
//!
//! - an empty filter (`Expression::none()`) adds no predicate;
//! - a filter whose language the repository cannot evaluate is a capability
//!   error ([`RepositoryError::UnsupportedLanguage`]), never a pass-through;
//! - a record that exists but fails the filter is reported exactly like a
//!   record that does not exist ([`RepositoryError::NotFound`]);
//! - collection scans apply the filter per candidate and return only matches.
//!
//! The decision filter and a caller's selection stay separate expressions
//! all the way down and are combined as predicates, never as source text, so
//! a selection can only narrow what the decision admits.
//!
//! Storage engines that push the filter into a native query implement
//! [`ResourceRepository`] directly. Engines that scan in process can use
//! [`FilterEvaluators`] to compile each expression once, by language, through
//! an [`ExpressionEvaluator`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cazi_claims::Claims;

use crate::context::{CallContext, Interrupted};
use crate::models::Expression;

/// Error from a repository operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The record is absent or hidden by the filter. The two cases are
    /// indistinguishable by construction.
    #[error("not found")]
    NotFound,

    /// The repository cannot evaluate expressions in this language.
    #[error("unsupported expression language: {language}")]
    UnsupportedLanguage { language: String },

    /// The decision filter is in a supported language but could not be
    /// compiled or evaluated.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// The caller's selection predicate is malformed.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("repository call cancelled")]
    Cancelled,

    #[error("repository call deadline exceeded")]
    DeadlineExceeded,

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// `true` when the repository could not honor the filter at all.
    #[must_use]
    pub fn is_capability_error(&self) -> bool {
        matches!(self, Self::UnsupportedLanguage { .. })
    }
}

impl From<Interrupted> for RepositoryError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Storage for one resource type, honoring delegated filters.
///
/// Every operation takes the same [`CallContext`] used for the preceding
/// authorization call.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    type Record: Send + Sync;
    type Id: Send + Sync;

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// `Cancelled`, `DeadlineExceeded` or `Storage`.
    async fn save(&self, ctx: &CallContext, record: Self::Record) -> Result<(), RepositoryError>;

    /// Look up one record by id, ANDed with `filter`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record is absent or fails the filter
    /// - `UnsupportedLanguage` if `filter.language` cannot be evaluated
    /// - `InvalidExpression`, `Cancelled`, `DeadlineExceeded`, `Storage`
    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: &Self::Id,
        filter: &Expression,
    ) -> Result<Self::Record, RepositoryError>;

    /// Return every record satisfying both the caller's `selection` and the
    /// decision `filter`.
    ///
    /// Both expressions are compiled before any record is read.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceRepository::find_by_id`], except that no match is
    /// an empty list rather than `NotFound`, plus `InvalidSelection` when
    /// `selection` is malformed.
    async fn find_all(
        &self,
        ctx: &CallContext,
        selection: &Expression,
        filter: &Expression,
    ) -> Result<Vec<Self::Record>, RepositoryError>;
}

/// Failure inside an expression evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// The source does not parse.
    #[error("failed to compile expression: {0}")]
    Compile(String),

    /// Evaluation against the bindings failed.
    #[error("failed to evaluate expression: {0}")]
    Execution(String),

    /// The expression produced something other than a boolean.
    #[error("expression did not produce a boolean, got {0}")]
    NotBoolean(String),
}

/// A compiled expression, tested against one record's bindings at a time.
pub trait Predicate: Send + Sync {
    /// Evaluate against `bindings`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] if evaluation fails or is not boolean.
    fn matches(&self, bindings: &Claims) -> Result<bool, EvaluationError>;
}

/// Compiles expressions of one language into [`Predicate`]s.
pub trait ExpressionEvaluator: Send + Sync {
    /// Language identifier this evaluator accepts (e.g. `"cel"`).
    fn language(&self) -> &str;

    /// Parse `source` once, ahead of any candidate.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Compile`] if the source is malformed.
    fn compile(&self, source: &str) -> Result<Box<dyn Predicate>, EvaluationError>;
}

/// Language-keyed set of evaluators available to an in-process repository.
#[derive(Clone, Default)]
pub struct FilterEvaluators {
    evaluators: BTreeMap<String, Arc<dyn ExpressionEvaluator>>,
}

impl FilterEvaluators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evaluator, replacing any previous one for its language.
    #[must_use]
    pub fn with(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.register(evaluator);
        self
    }

    pub fn register(&mut self, evaluator: Arc<dyn ExpressionEvaluator>) {
        self.evaluators
            .insert(evaluator.language().to_owned(), evaluator);
    }

    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.evaluators.contains_key(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.evaluators.keys().map(String::as_str)
    }

    /// Compile a decision filter once, before touching storage.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::UnsupportedLanguage`] when no evaluator is
    ///   registered for `filter.language`
    /// - [`RepositoryError::InvalidExpression`] when the source does not
    ///   compile
    pub fn prepare(&self, filter: &Expression) -> Result<RecordFilter, RepositoryError> {
        self.compile(filter, RepositoryError::InvalidExpression)
    }

    /// Compile a caller-supplied selection once, before touching storage.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::UnsupportedLanguage`] when no evaluator is
    ///   registered for `selection.language`
    /// - [`RepositoryError::InvalidSelection`] when the source does not
    ///   compile
    pub fn prepare_selection(
        &self,
        selection: &Expression,
    ) -> Result<RecordFilter, RepositoryError> {
        self.compile(selection, RepositoryError::InvalidSelection)
    }

    fn compile(
        &self,
        expression: &Expression,
        invalid: fn(String) -> RepositoryError,
    ) -> Result<RecordFilter, RepositoryError> {
        if expression.is_none() {
            return Ok(RecordFilter::all());
        }
        let evaluator = self.evaluators.get(&expression.language).ok_or_else(|| {
            RepositoryError::UnsupportedLanguage {
                language: expression.language.clone(),
            }
        })?;
        let predicate = evaluator
            .compile(&expression.source)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(RecordFilter {
            clauses: vec![Clause {
                expression: expression.clone(),
                predicate,
                invalid,
            }],
        })
    }
}

impl fmt::Debug for FilterEvaluators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEvaluators")
            .field("languages", &self.evaluators.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct Clause {
    expression: Expression,
    predicate: Box<dyn Predicate>,
    // Decision filters and selections report failures differently.
    invalid: fn(String) -> RepositoryError,
}

/// Compiled conjunction of filters, ready to test candidates.
///
/// With no clauses every candidate matches.
pub struct RecordFilter {
    clauses: Vec<Clause>,
}

impl RecordFilter {
    /// The filter that admits every candidate.
    #[must_use]
    pub fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// `true` when no clause restricts the candidates.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Test one candidate against every clause, stopping at the first miss.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidExpression`] (decision filter) or
    /// [`RepositoryError::InvalidSelection`] (caller selection) if evaluation
    /// fails.
    pub fn matches(&self, bindings: &Claims) -> Result<bool, RepositoryError> {
        for clause in &self.clauses {
            let matched = clause
                .predicate
                .matches(bindings)
                .map_err(|e| (clause.invalid)(e.to_string()))?;
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.clauses.iter().map(|c| c.expression.to_string()))
            .finish()
    }
}
