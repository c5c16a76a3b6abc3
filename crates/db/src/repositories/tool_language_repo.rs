//! Repository for the `tool_languages` table.
//!
//! Writes are scoped to one employee through the owning position, so a plan
//! can never touch another employee's rows.

use sqlx::{PgConnection, PgPool};
use roster_core::reconcile::ToolLanguageFields;
use roster_core::types::DbId;

use crate::models::tool_language::ToolLanguage;

const COLUMNS: &str =
    "id, position_id, tool_language_resource_id, display_order, from_year, to_year, description";

pub struct ToolLanguageRepo;

impl ToolLanguageRepo {
    /// All tool/languages of the given positions, in display order.
    pub async fn list_by_positions(
        pool: &PgPool,
        position_ids: &[DbId],
    ) -> Result<Vec<ToolLanguage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tool_languages
             WHERE position_id = ANY($1)
             ORDER BY display_order ASC, id ASC"
        );
        sqlx::query_as::<_, ToolLanguage>(&query)
            .bind(position_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        conn: &mut PgConnection,
        position_id: DbId,
        fields: &ToolLanguageFields,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO tool_languages
                (position_id, tool_language_resource_id, display_order, from_year, to_year, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(position_id)
        .bind(fields.tool_language_resource_id)
        .bind(fields.display_order)
        .bind(fields.from_year)
        .bind(fields.to_year)
        .bind(&fields.description)
        .fetch_one(conn)
        .await
    }

    /// Overwrite the scalar fields of a tool/language. Returns `true` if the
    /// row exists under `employee_id` and was updated.
    pub async fn update(
        conn: &mut PgConnection,
        employee_id: DbId,
        id: DbId,
        fields: &ToolLanguageFields,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tool_languages t SET
                tool_language_resource_id = $3,
                display_order = $4,
                from_year = $5,
                to_year = $6,
                description = $7
             FROM positions p
             WHERE t.id = $1 AND t.position_id = p.id AND p.employee_id = $2",
        )
        .bind(id)
        .bind(employee_id)
        .bind(fields.tool_language_resource_id)
        .bind(fields.display_order)
        .bind(fields.from_year)
        .bind(fields.to_year)
        .bind(&fields.description)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete tool/languages under `employee_id`; their images cascade.
    pub async fn delete_many(
        conn: &mut PgConnection,
        employee_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM tool_languages t
             USING positions p
             WHERE t.id = ANY($1) AND t.position_id = p.id AND p.employee_id = $2",
        )
        .bind(ids)
        .bind(employee_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
