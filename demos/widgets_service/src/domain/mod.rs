//! Domain layer: widget model, repository contract, service.
//!
//! The service is the PEP. It never inspects filter expressions; it passes
//! them from the authorization decision to the repository as received.

pub mod error;
pub mod repos;
pub mod service;
pub mod widget;

pub use error::DomainError;
pub use repos::WidgetRepository;
pub use service::WidgetService;
pub use widget::{NewWidget, Widget, WidgetId};
