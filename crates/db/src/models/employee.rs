//! Employee entity model.

use serde::Serialize;
use sqlx::FromRow;
use roster_core::types::{DbId, Timestamp, Version};

/// An employee row from the `employees` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Employee {
    pub id: DbId,
    pub name: String,
    /// Optimistic-concurrency token, bumped by every committed reconciliation.
    pub version: Version,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
