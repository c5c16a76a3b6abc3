//! Tool/language entity model.

use serde::Serialize;
use sqlx::FromRow;
use roster_core::types::DbId;

/// A row from the `tool_languages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ToolLanguage {
    pub id: DbId,
    pub position_id: DbId,
    pub tool_language_resource_id: DbId,
    pub display_order: i32,
    /// Always `<= to_year` (enforced by `ck_tool_languages_year_range`).
    pub from_year: i32,
    pub to_year: i32,
    pub description: String,
}
