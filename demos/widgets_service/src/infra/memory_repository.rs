//! In-memory widget storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cazi_sdk::repository::{FilterEvaluators, RepositoryError, ResourceRepository};
use cazi_sdk::{CallContext, Expression};
use parking_lot::RwLock;

use super::cel::CelEvaluator;
use crate::domain::{Widget, WidgetId};

/// Widget storage held in process memory.
///
/// Filters are compiled once through the registered [`FilterEvaluators`]
/// and then tested per record. Compilation happens before any record is
/// looked up, so an unsupported language or a malformed expression fails the
/// same way whether or not the store holds matching records.
pub struct InMemoryWidgetRepository {
    widgets: RwLock<BTreeMap<WidgetId, Widget>>,
    evaluators: FilterEvaluators,
}

impl InMemoryWidgetRepository {
    #[must_use]
    pub fn new(evaluators: FilterEvaluators) -> Self {
        Self {
            widgets: RwLock::new(BTreeMap::new()),
            evaluators,
        }
    }

    /// Repository able to evaluate CEL filters.
    #[must_use]
    pub fn with_cel() -> Self {
        Self::new(FilterEvaluators::new().with(Arc::new(CelEvaluator)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.read().is_empty()
    }
}

impl Default for InMemoryWidgetRepository {
    fn default() -> Self {
        Self::with_cel()
    }
}

#[async_trait]
impl ResourceRepository for InMemoryWidgetRepository {
    type Record = Widget;
    type Id = WidgetId;

    async fn save(&self, ctx: &CallContext, record: Widget) -> Result<(), RepositoryError> {
        ctx.check()?;
        self.widgets.write().insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_by_id(
        &self,
        ctx: &CallContext,
        id: &WidgetId,
        filter: &Expression,
    ) -> Result<Widget, RepositoryError> {
        ctx.check()?;
        let filter = self.evaluators.prepare(filter)?;

        let candidate = self.widgets.read().get(id).cloned();
        match candidate {
            Some(widget) if filter.matches(&widget.bindings())? => Ok(widget),
            // Absent and filtered out are the same outcome.
            Some(_) | None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_all(
        &self,
        ctx: &CallContext,
        selection: &Expression,
        filter: &Expression,
    ) -> Result<Vec<Widget>, RepositoryError> {
        ctx.check()?;
        let filter = self
            .evaluators
            .prepare_selection(selection)?
            .and(self.evaluators.prepare(filter)?);

        let candidates: Vec<Widget> = self.widgets.read().values().cloned().collect();
        let mut matched = Vec::new();
        for widget in candidates {
            ctx.check()?;
            if filter.matches(&widget.bindings())? {
                matched.push(widget);
            }
        }
        Ok(matched)
    }
}
