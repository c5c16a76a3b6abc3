//! Role and tool/language catalog models.

use serde::Serialize;
use sqlx::FromRow;
use roster_core::types::DbId;

/// A row from the `position_resources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PositionResource {
    pub id: DbId,
    pub name: String,
}

/// A row from the `tool_language_resources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ToolLanguageResource {
    pub id: DbId,
    pub position_resource_id: DbId,
    pub name: String,
}

/// A role together with the tools/languages that belong to it.
#[derive(Debug, Clone, Serialize)]
pub struct PositionResourceWithTools {
    pub id: DbId,
    pub name: String,
    pub tool_language_resources: Vec<ToolLanguageResource>,
}
