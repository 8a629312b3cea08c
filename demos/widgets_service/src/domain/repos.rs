use cazi_sdk::repository::ResourceRepository;

use super::widget::{Widget, WidgetId};

/// Widget storage honoring delegated authorization filters.
pub trait WidgetRepository: ResourceRepository<Record = Widget, Id = WidgetId> {}

impl<T> WidgetRepository for T where T: ResourceRepository<Record = Widget, Id = WidgetId> {}
