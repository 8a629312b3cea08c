use std::sync::Arc;

use cazi_claims::StandardClaims;
use cazi_sdk::pep::PolicyEnforcer;
use cazi_sdk::{CallContext, Expression, ListObjectsRequest, Object, Subject};
use tracing::instrument;

use super::error::DomainError;
use super::repos::WidgetRepository;
use super::widget::{NewWidget, Widget, WidgetId, actions, resources};

/// Widgets service.
///
/// Acts as a PEP: every operation asks the authorization port first and
/// hands the resulting filter, unchanged, to the repository. A deny never
/// reaches storage.
pub struct WidgetService {
    repo: Arc<dyn WidgetRepository>,
    enforcer: PolicyEnforcer,
    standard: StandardClaims,
}

impl WidgetService {
    #[must_use]
    pub fn new(repo: Arc<dyn WidgetRepository>, enforcer: PolicyEnforcer) -> Self {
        Self {
            repo,
            enforcer,
            standard: StandardClaims::new(),
        }
    }

    /// Create a widget owned by the authorized subject.
    ///
    /// Creation needs an unconditional allow; the owner is taken from the
    /// decision's `sub` requester claim, not from the request.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an empty name, `Forbidden` unless allowed, plus
    /// authorization and storage failures.
    #[instrument(skip(self, ctx, new_widget), fields(user_id = %user_id, name = %new_widget.name))]
    pub async fn create_widget(
        &self,
        ctx: &CallContext,
        user_id: &str,
        new_widget: NewWidget,
    ) -> Result<Widget, DomainError> {
        tracing::info!("Creating new widget");

        if new_widget.name.trim().is_empty() {
            return Err(DomainError::BadRequest("name must not be empty".to_owned()));
        }

        let id = WidgetId::generate();
        let grant = self
            .enforcer
            .authorize(
                ctx,
                subject(user_id),
                actions::CREATE,
                Object::resource(resources::WIDGET, id.as_str()),
            )
            .await?;

        // A conditional create would need a record to evaluate against.
        if !grant.is_unrestricted() {
            tracing::debug!(filter = %grant.filter(), "conditional create refused");
            return Err(DomainError::Forbidden);
        }

        let owner_id = self
            .standard
            .sub
            .get(grant.context().requester_context.as_ref())
            .ok_or_else(|| {
                DomainError::Internal("authorization decision carries no subject".to_owned())
            })?;

        let widget = Widget {
            id,
            name: new_widget.name,
            description: new_widget.description,
            owner_id,
        };
        self.repo.save(ctx, widget.clone()).await?;

        tracing::info!(widget_id = %widget.id, "Successfully created widget");
        Ok(widget)
    }

    /// Fetch one widget the subject may read.
    ///
    /// # Errors
    ///
    /// `NotFound` when the widget is missing or hidden by the policy filter,
    /// `Forbidden` on an explicit deny, `Unsupported` when storage cannot
    /// evaluate the filter.
    #[instrument(skip(self, ctx), fields(user_id = %user_id, widget_id = %id))]
    pub async fn get_widget(
        &self,
        ctx: &CallContext,
        user_id: &str,
        id: &WidgetId,
    ) -> Result<Widget, DomainError> {
        tracing::debug!("Getting widget by id");

        let grant = self
            .enforcer
            .authorize(
                ctx,
                subject(user_id),
                actions::READ,
                Object::resource(resources::WIDGET, id.as_str()),
            )
            .await?;

        let widget = self.repo.find_by_id(ctx, id, grant.filter()).await?;

        tracing::debug!("Successfully retrieved widget");
        Ok(widget)
    }

    /// List the widgets the subject may read, optionally narrowed by
    /// `filter`.
    ///
    /// The caller's filter goes to storage as a selection next to the
    /// decision filter, never merged into it, so it only narrows the result.
    ///
    /// # Errors
    ///
    /// `BadRequest` when the filter is in a language the policy rejects or
    /// does not parse, `Forbidden` on an explicit deny, `Unsupported` when
    /// storage cannot evaluate the decision filter.
    #[instrument(skip(self, ctx, filter), fields(user_id = %user_id))]
    pub async fn list_widgets(
        &self,
        ctx: &CallContext,
        user_id: &str,
        filter: Expression,
    ) -> Result<Vec<Widget>, DomainError> {
        tracing::debug!("Listing widgets");

        let request = ListObjectsRequest::new(subject(user_id), actions::READ, resources::WIDGET)
            .with_filter(filter.clone());
        let grant = self.enforcer.authorize_list_request(ctx, request).await?;

        let widgets = self.repo.find_all(ctx, &filter, grant.filter()).await?;

        tracing::debug!("Successfully listed {} widgets", widgets.len());
        Ok(widgets)
    }
}

fn subject(user_id: &str) -> Subject {
    Subject::resource(resources::USER, user_id)
}
