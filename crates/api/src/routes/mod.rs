pub mod employee;
pub mod health;
pub mod resources;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /employees                                       list, create (multipart)
/// /employees/{id}                                  get, update (multipart), delete
///
/// /position-resources                              roles with nested tools
/// /tool-language-resources                         flat tool catalog
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/employees", employee::router())
        .merge(resources::router())
}
