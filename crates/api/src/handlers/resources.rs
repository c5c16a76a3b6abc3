//! Read-only handlers for the role and tool/language catalogs.

use axum::extract::State;
use axum::Json;
use roster_db::models::resource::{PositionResourceWithTools, ToolLanguageResource};
use roster_db::repositories::ResourceRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/position-resources
///
/// Every role with its tools/languages nested.
pub async fn list_position_resources(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PositionResourceWithTools>>> {
    let roles = ResourceRepo::list_position_resources_with_tools(&state.pool).await?;
    Ok(Json(roles))
}

/// GET /api/v1/tool-language-resources
pub async fn list_tool_language_resources(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ToolLanguageResource>>> {
    let tools = ResourceRepo::list_tool_language_resources(&state.pool).await?;
    Ok(Json(tools))
}
