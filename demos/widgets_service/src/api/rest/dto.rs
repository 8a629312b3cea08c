use serde::{Deserialize, Serialize};

use crate::domain::{NewWidget, Widget};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWidgetReq {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<CreateWidgetReq> for NewWidget {
    fn from(req: CreateWidgetReq) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
}

impl From<Widget> for WidgetDto {
    fn from(widget: Widget) -> Self {
        Self {
            id: widget.id.to_string(),
            name: widget.name,
            description: widget.description,
            owner_id: widget.owner_id,
        }
    }
}

/// Optional caller filter for listings, e.g. `?filter=name == 'gear'`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListWidgetsQuery {
    pub filter: Option<String>,
    /// Language of `filter`; CEL when omitted.
    pub filter_language: Option<String>,
}
