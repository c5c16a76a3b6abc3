use axum::routing::get;
use axum::Router;

use crate::handlers::resources;
use crate::state::AppState;

/// Catalog routes, merged at the `/api/v1` root.
///
/// ```text
/// GET /position-resources        -> list_position_resources
/// GET /tool-language-resources   -> list_tool_language_resources
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/position-resources",
            get(resources::list_position_resources),
        )
        .route(
            "/tool-language-resources",
            get(resources::list_tool_language_resources),
        )
}
