#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end checks of the filter delegation flow: port decision, PEP
//! compilation, and a repository honoring the delegated filter.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cazi_sdk::pep::{EnforcerError, PolicyEnforcer};
use cazi_sdk::repository::{
    EvaluationError, ExpressionEvaluator, FilterEvaluators, Predicate, RepositoryError,
    ResourceRepository,
};
use cazi_sdk::{
    AuthorizationPort, CallContext, CaziError, CheckRequest, CheckResponse, Claims, Expression,
    ListObjectsRequest, ListObjectsResponse, Object, Subject,
};
use serde_json::json;

const EQ: &str = "test-eq";

/// Compiles `field == 'value'` into a string comparison.
struct EqEvaluator;

struct FieldEquals {
    field: String,
    value: String,
}

impl Predicate for FieldEquals {
    fn matches(&self, bindings: &Claims) -> Result<bool, EvaluationError> {
        Ok(bindings.get(&self.field).and_then(|v| v.as_str()) == Some(self.value.as_str()))
    }
}

impl ExpressionEvaluator for EqEvaluator {
    fn language(&self) -> &str {
        EQ
    }

    fn compile(&self, source: &str) -> Result<Box<dyn Predicate>, EvaluationError> {
        let (field, value) = source
            .split_once("==")
            .ok_or_else(|| EvaluationError::Compile(source.to_owned()))?;
        Ok(Box::new(FieldEquals {
            field: field.trim().to_owned(),
            value: value.trim().trim_matches('\'').to_owned(),
        }))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Doc {
    id: String,
    owner: String,
}

impl Doc {
    fn bindings(&self) -> Claims {
        let mut claims = Claims::new();
        claims.insert("id".to_owned(), json!(self.id));
        claims.insert("owner".to_owned(), json!(self.owner));
        claims
    }
}

struct DocRepo {
    docs: Mutex<BTreeMap<String, Doc>>,
    evaluators: FilterEvaluators,
}

impl DocRepo {
    fn new(docs: &[(&str, &str)]) -> Self {
        let docs = docs
            .iter()
            .map(|(id, owner)| {
                (
                    (*id).to_owned(),
                    Doc {
                        id: (*id).to_owned(),
                        owner: (*owner).to_owned(),
                    },
                )
            })
            .collect();
        Self {
            docs: Mutex::new(docs),
            evaluators: FilterEvaluators::new().with(Arc::new(EqEvaluator)),
        }
    }
}

#[async_trait]
impl ResourceRepository for DocRepo {
    type Record = Doc;
    type Id = String;

    async fn save(&self, ctx: &CallContext, record: Doc) -> Result<(), RepositoryError> {
        ctx.check()?;
        self.docs.lock().unwrap().insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: &String,
        filter: &Expression,
    ) -> Result<Doc, RepositoryError> {
        ctx.check()?;
        let filter = self.evaluators.prepare(filter)?;
        let doc = self
            .docs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if filter.matches(&doc.bindings())? {
            Ok(doc)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn find_all(
        &self,
        ctx: &CallContext,
        selection: &Expression,
        filter: &Expression,
    ) -> Result<Vec<Doc>, RepositoryError> {
        ctx.check()?;
        let filter = self
            .evaluators
            .prepare_selection(selection)?
            .and(self.evaluators.prepare(filter)?);
        let docs: Vec<Doc> = self.docs.lock().unwrap().values().cloned().collect();
        let mut out = Vec::new();
        for doc in docs {
            if filter.matches(&doc.bindings())? {
                out.push(doc);
            }
        }
        Ok(out)
    }
}

/// Owners may read their documents; everyone may create; nobody may delete.
struct OwnerPolicy {
    language: &'static str,
}

impl OwnerPolicy {
    fn owner_filter(&self, subject: &Subject) -> Result<Expression, CaziError> {
        let user = subject
            .assertion
            .as_resource_reference()
            .ok_or_else(|| CaziError::InvalidSubject("expected a resource reference".to_owned()))?;
        Ok(Expression::new(self.language, format!("owner == '{}'", user.id)))
    }
}

#[async_trait]
impl AuthorizationPort for OwnerPolicy {
    async fn check(
        &self,
        ctx: &CallContext,
        request: CheckRequest,
    ) -> Result<CheckResponse, CaziError> {
        ctx.check()?;
        match request.verb.as_str() {
            "create" => Ok(CheckResponse::allow()),
            "read" => Ok(CheckResponse::conditional(
                self.owner_filter(&request.subject)?,
            )),
            "delete" => Ok(CheckResponse::deny()),
            other => Err(CaziError::UnsupportedVerb(other.to_owned())),
        }
    }

    async fn list_objects(
        &self,
        ctx: &CallContext,
        request: ListObjectsRequest,
    ) -> Result<ListObjectsResponse, CaziError> {
        ctx.check()?;
        Ok(ListObjectsResponse::conditional(
            self.owner_filter(&request.subject)?,
        ))
    }
}

fn enforcer(language: &'static str) -> PolicyEnforcer {
    PolicyEnforcer::new(Arc::new(OwnerPolicy { language }))
}

fn repo() -> DocRepo {
    DocRepo::new(&[
        ("d1", "alice"),
        ("d2", "bob"),
        ("d3", "alice"),
        ("d4", "carol"),
        ("d5", "bob"),
    ])
}

fn alice() -> Subject {
    Subject::resource("user", "alice")
}

async fn read(
    enforcer: &PolicyEnforcer,
    repo: &DocRepo,
    ctx: &CallContext,
    id: &str,
) -> Result<Doc, String> {
    let grant = enforcer
        .authorize(ctx, alice(), "read", Object::resource("doc", id))
        .await
        .map_err(|e| e.to_string())?;
    repo.find_by_id(ctx, &id.to_owned(), grant.filter())
        .await
        .map_err(|e| e.to_string())
}

// ── single lookup ────────────────────────────────────────────────────

#[tokio::test]
async fn owner_reads_own_record() {
    let ctx = CallContext::new();
    let doc = read(&enforcer(EQ), &repo(), &ctx, "d1").await.unwrap();
    assert_eq!(doc.owner, "alice");
}

#[tokio::test]
async fn forbidden_and_missing_are_indistinguishable() {
    let ctx = CallContext::new();
    let enforcer = enforcer(EQ);
    let repo = repo();

    let forbidden = read(&enforcer, &repo, &ctx, "d2").await.unwrap_err();
    let missing = read(&enforcer, &repo, &ctx, "nope").await.unwrap_err();

    assert_eq!(forbidden, missing);
}

#[tokio::test]
async fn allow_queries_without_filter() {
    let ctx = CallContext::new();
    let grant = enforcer(EQ)
        .authorize(&ctx, alice(), "create", Object::resource("doc", "d9"))
        .await
        .unwrap();
    assert!(grant.is_unrestricted());

    let repo = repo();
    repo.save(
        &ctx,
        Doc {
            id: "d9".to_owned(),
            owner: "alice".to_owned(),
        },
    )
    .await
    .unwrap();
    let all = repo.find_all(&ctx, &Expression::none(), grant.filter()).await.unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn deny_never_reaches_storage() {
    let result = enforcer(EQ)
        .authorize(&CallContext::new(), alice(), "delete", Object::resource("doc", "d1"))
        .await;

    assert!(result.unwrap_err().is_denied());
}

#[tokio::test]
async fn unknown_verb_is_a_request_error_not_a_denial() {
    let err = enforcer(EQ)
        .authorize(&CallContext::new(), alice(), "share", Object::resource("doc", "d1"))
        .await
        .unwrap_err();

    match err {
        EnforcerError::EvaluationFailed(e) => assert!(e.is_request_shape()),
        EnforcerError::CompileFailed(e) => panic!("expected request error, got {e}"),
    }
}

// ── capability errors ────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_language_is_capability_error_even_for_missing_ids() {
    let ctx = CallContext::new();
    let grant = enforcer("sql")
        .authorize(&ctx, alice(), "read", Object::resource("doc", "nope"))
        .await
        .unwrap();
    let repo = repo();

    let present = repo
        .find_by_id(&ctx, &"d1".to_owned(), grant.filter())
        .await
        .unwrap_err();
    let absent = repo
        .find_by_id(&ctx, &"nope".to_owned(), grant.filter())
        .await
        .unwrap_err();

    assert!(present.is_capability_error());
    assert!(absent.is_capability_error());
    assert_ne!(present, RepositoryError::NotFound);
}

#[tokio::test]
async fn unsupported_language_fails_collection_scan() {
    let err = repo()
        .find_all(
            &CallContext::new(),
            &Expression::none(),
            &Expression::new("sql", "owner = 'alice'"),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RepositoryError::UnsupportedLanguage {
            language: "sql".to_owned()
        }
    );
}

// ── collection scan ──────────────────────────────────────────────────

#[tokio::test]
async fn list_returns_only_matching_candidates() {
    let ctx = CallContext::new();
    let grant = enforcer(EQ)
        .authorize_list(&ctx, alice(), "read", "doc")
        .await
        .unwrap();

    let mut ids: Vec<String> = repo()
        .find_all(&ctx, &Expression::none(), grant.filter())
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    ids.sort();

    assert_eq!(ids, vec!["d1", "d3"]);
}

#[tokio::test]
async fn selection_narrows_but_never_widens() {
    let ctx = CallContext::new();
    let grant = enforcer(EQ)
        .authorize_list(&ctx, alice(), "read", "doc")
        .await
        .unwrap();
    let repo = repo();

    let own = repo
        .find_all(&ctx, &Expression::new(EQ, "id == 'd3'"), grant.filter())
        .await
        .unwrap();
    let foreign = repo
        .find_all(&ctx, &Expression::new(EQ, "owner == 'bob'"), grant.filter())
        .await
        .unwrap();

    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, "d3");
    assert!(foreign.is_empty());
}

#[tokio::test]
async fn malformed_selection_fails_even_on_empty_store() {
    let err = DocRepo::new(&[])
        .find_all(
            &CallContext::new(),
            &Expression::new(EQ, "no equality here"),
            &Expression::none(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::InvalidSelection(_)));
}

#[tokio::test]
async fn repeated_decisions_are_identical() {
    let ctx = CallContext::new();
    let enforcer = enforcer(EQ);
    let first = enforcer
        .authorize_list(&ctx, alice(), "read", "doc")
        .await
        .unwrap();
    let second = enforcer
        .authorize_list(&ctx, alice(), "read", "doc")
        .await
        .unwrap();

    assert_eq!(first, second);
}

// ── cancellation ─────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_context_stops_both_calls() {
    let ctx = CallContext::new();
    ctx.cancel();

    let authz = enforcer(EQ)
        .authorize(&ctx, alice(), "read", Object::resource("doc", "d1"))
        .await
        .unwrap_err();
    assert!(matches!(
        authz,
        EnforcerError::EvaluationFailed(CaziError::Cancelled)
    ));

    let storage = repo()
        .find_all(&ctx, &Expression::none(), &Expression::none())
        .await
        .unwrap_err();
    assert_eq!(storage, RepositoryError::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_reaches_repository() {
    let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
    let grant = enforcer(EQ)
        .authorize(&ctx, alice(), "read", Object::resource("doc", "d1"))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_millis(20)).await;

    let err = repo()
        .find_by_id(&ctx, &"d1".to_owned(), grant.filter())
        .await
        .unwrap_err();
    assert_eq!(err, RepositoryError::DeadlineExceeded);
}
