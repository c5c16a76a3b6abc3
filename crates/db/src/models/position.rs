//! Position entity model.

use serde::Serialize;
use sqlx::FromRow;
use roster_core::types::DbId;

/// A position row from the `positions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Position {
    pub id: DbId,
    pub employee_id: DbId,
    pub position_resource_id: DbId,
    pub display_order: i32,
}
