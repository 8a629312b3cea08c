use std::fmt;

use cazi_claims::Claims;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Resource type names used in authorization requests.
pub mod resources {
    pub const USER: &str = "user";
    pub const WIDGET: &str = "widget";
}

/// Verbs understood by the widget policy.
pub mod actions {
    pub const CREATE: &str = "create";
    pub const READ: &str = "read";
}

/// Name under which a widget's fields are also exposed as one object, so
/// filters may use either `owner_id` or `widget.owner_id`.
pub const BINDING: &str = "widget";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub name: String,
    pub description: String,
    /// Subject id of the creator.
    pub owner_id: String,
}

impl Widget {
    /// Variables a filter expression is evaluated against.
    #[must_use]
    pub fn bindings(&self) -> Claims {
        let mut fields = Claims::new();
        fields.insert("id".to_owned(), Value::String(self.id.to_string()));
        fields.insert("name".to_owned(), Value::String(self.name.clone()));
        fields.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        fields.insert("owner_id".to_owned(), Value::String(self.owner_id.clone()));

        let mut bindings = fields.clone();
        bindings.insert(BINDING.to_owned(), Value::Object(fields));
        bindings
    }
}

/// Data for creating a new widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWidget {
    pub name: String,
    pub description: String,
}
