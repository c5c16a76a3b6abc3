//! Repository for the `images` table.

use sqlx::{PgConnection, PgPool};
use roster_core::reconcile::ImageFields;
use roster_core::types::DbId;

use crate::models::image::Image;

const COLUMNS: &str = "id, tool_language_id, cdn_url, display_order";

pub struct ImageRepo;

impl ImageRepo {
    /// All images of the given tool/languages, in display order.
    pub async fn list_by_tool_languages(
        pool: &PgPool,
        tool_language_ids: &[DbId],
    ) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images
             WHERE tool_language_id = ANY($1)
             ORDER BY display_order ASC, id ASC"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(tool_language_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        conn: &mut PgConnection,
        tool_language_id: DbId,
        fields: &ImageFields,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO images (tool_language_id, cdn_url, display_order)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(tool_language_id)
        .bind(&fields.cdn_url)
        .bind(fields.display_order)
        .fetch_one(conn)
        .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        employee_id: DbId,
        id: DbId,
        fields: &ImageFields,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE images i SET cdn_url = $3, display_order = $4
             FROM tool_languages t
             JOIN positions p ON p.id = t.position_id
             WHERE i.id = $1 AND i.tool_language_id = t.id AND p.employee_id = $2",
        )
        .bind(id)
        .bind(employee_id)
        .bind(&fields.cdn_url)
        .bind(fields.display_order)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_many(
        conn: &mut PgConnection,
        employee_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM images i
             USING tool_languages t, positions p
             WHERE i.id = ANY($1)
               AND i.tool_language_id = t.id
               AND t.position_id = p.id
               AND p.employee_id = $2",
        )
        .bind(ids)
        .bind(employee_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
