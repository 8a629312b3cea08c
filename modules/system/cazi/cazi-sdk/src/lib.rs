#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! CAZI SDK
//!
//! The common authorization interface: a resource-owning service asks
//! "can subject S perform verb V on object O?" and gets back allow, deny, or
//! a conditional expression it must evaluate against its own data.
//!
//! - [`AuthorizationPort`] - trait implemented by policy engines
//! - [`CheckRequest`], [`CheckResponse`], [`ListObjectsRequest`],
//!   [`ListObjectsResponse`] - decision models
//! - [`DecisionKind`], [`Expression`] - decision outcome and its condition
//! - [`CallContext`] - cancellation and deadline threaded through every call
//! - [`CaziError`] - port error taxonomy
//! - [`repository`] - contracts for repositories receiving delegated filters
//! - [`pep`] - PEP helpers (decision compiler, enforcer)
//!
//! ## Usage
//!
//! ```ignore
//! use cazi_sdk::{CallContext, Object, Subject, pep::PolicyEnforcer};
//!
//! let enforcer = PolicyEnforcer::new(authz.clone());
//! let ctx = CallContext::new().with_timeout(Duration::from_secs(2));
//!
//! let grant = enforcer
//!     .authorize(&ctx, Subject::resource("user", "alice"), "read", Object::resource("widget", "w1"))
//!     .await?;
//!
//! // The filter goes to storage unchanged.
//! let widget = repo.find_by_id(&ctx, &id, grant.filter()).await?;
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod models;
pub mod pep;
pub mod repository;

// Re-export main types at crate root
pub use api::AuthorizationPort;
pub use cazi_claims::{Claim, Claims};
pub use context::{CallContext, Interrupted};
pub use error::CaziError;
pub use models::{
    Assertion, AuthorizationContext, CheckRequest, CheckResponse, ConsistencyToken, DecisionKind,
    Expression, ListObjectsRequest, ListObjectsResponse, Object, OpaqueToken, ResourceReference,
    Subject, languages,
};
pub use pep::PolicyEnforcer;
