#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Widgets service
//!
//! A resource-owning service acting as a Policy Enforcement Point over the
//! common authorization interface. Reads are authorized by a conditional
//! ownership decision whose filter is evaluated by storage, so a widget the
//! caller does not own is indistinguishable from one that does not exist.

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use axum::Router;
use cazi_sdk::AuthorizationPort;
use cazi_sdk::pep::PolicyEnforcer;
use static_cazi_plugin::Service as StaticPolicy;
use tokio_util::sync::CancellationToken;

use crate::api::rest::{self, AppState};
use crate::config::AppConfig;
use crate::domain::{WidgetRepository, WidgetService};
use crate::infra::InMemoryWidgetRepository;

/// Wire the service with the static policy and the given repository.
///
/// # Errors
///
/// Returns an error if the policy configuration is invalid.
pub fn build_service(
    config: &AppConfig,
    repo: Arc<dyn WidgetRepository>,
) -> anyhow::Result<WidgetService> {
    let policy = StaticPolicy::new(config.authz.clone())?;
    let authz: Arc<dyn AuthorizationPort> = Arc::new(policy);
    Ok(WidgetService::new(repo, PolicyEnforcer::new(authz)))
}

/// Build the HTTP application backed by in-memory storage.
///
/// # Errors
///
/// Returns an error if the policy configuration is invalid.
pub fn build_router(config: &AppConfig, shutdown: CancellationToken) -> anyhow::Result<Router> {
    let repo: Arc<dyn WidgetRepository> = Arc::new(InMemoryWidgetRepository::with_cel());
    let service = build_service(config, repo)?;
    tracing::info!(
        mode = ?config.authz.mode,
        object_type = %config.authz.object_type,
        "widgets service wired"
    );
    Ok(rest::router(AppState::new(
        Arc::new(service),
        shutdown,
        config.server.request_timeout(),
    )))
}
