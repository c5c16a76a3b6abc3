//! Image entity model.

use serde::Serialize;
use sqlx::FromRow;
use roster_core::types::DbId;

/// A row from the `images` table. Bytes live on the CDN; only the URL is kept.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub tool_language_id: DbId,
    pub cdn_url: String,
    pub display_order: i32,
}
