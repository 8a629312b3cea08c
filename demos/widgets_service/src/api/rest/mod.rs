//! REST endpoints for widgets.
//!
//! | Method | Path            | Verb     |
//! |--------|-----------------|----------|
//! | POST   | `/widgets`      | `create` |
//! | GET    | `/widgets`      | `read` (collection) |
//! | GET    | `/widgets/{id}` | `read`   |
//!
//! The caller is identified by the `X-User-ID` header.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};

pub use handlers::AppState;

/// Build the widgets router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/widgets",
            post(handlers::create_widget).get(handlers::list_widgets),
        )
        .route("/widgets/{id}", get(handlers::get_widget))
        .with_state(state)
}
