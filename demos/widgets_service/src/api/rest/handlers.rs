use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use cazi_sdk::{CallContext, Expression, languages};
use tokio_util::sync::CancellationToken;

use super::dto::{CreateWidgetReq, ListWidgetsQuery, WidgetDto};
use super::error::ApiError;
use crate::domain::{DomainError, WidgetId, WidgetService};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<WidgetService>,
    shutdown: CancellationToken,
    request_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(
        service: Arc<WidgetService>,
        shutdown: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            shutdown,
            request_timeout,
        }
    }

    /// One context per request: cancelled on shutdown, bounded by the
    /// request timeout, shared by the authorization and storage calls.
    fn call_context(&self) -> CallContext {
        CallContext::with_cancellation(self.shutdown.child_token())
            .with_timeout(self.request_timeout)
    }
}

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(ApiError::Unauthorized)
}

pub async fn create_widget(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateWidgetReq>, JsonRejection>,
) -> Result<(StatusCode, Json<WidgetDto>), ApiError> {
    let user_id = user_id(&headers)?;
    let Json(req) =
        payload.map_err(|e| DomainError::BadRequest(format!("invalid request body: {e}")))?;

    let widget = state
        .service
        .create_widget(&state.call_context(), &user_id, req.into())
        .await?;

    Ok((StatusCode::CREATED, Json(widget.into())))
}

pub async fn get_widget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<WidgetDto>, ApiError> {
    let user_id = user_id(&headers)?;

    let widget = state
        .service
        .get_widget(&state.call_context(), &user_id, &WidgetId::new(id))
        .await?;

    Ok(Json(widget.into()))
}

pub async fn list_widgets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListWidgetsQuery>,
) -> Result<Json<Vec<WidgetDto>>, ApiError> {
    let user_id = user_id(&headers)?;

    let filter = match query.filter {
        Some(source) => Expression::new(
            query
                .filter_language
                .unwrap_or_else(|| languages::CEL.to_owned()),
            source,
        ),
        None => Expression::none(),
    };

    let widgets = state
        .service
        .list_widgets(&state.call_context(), &user_id, filter)
        .await?;

    Ok(Json(widgets.into_iter().map(WidgetDto::from).collect()))
}
