//! Repository for the `positions` table.

use sqlx::{PgConnection, PgPool};
use roster_core::reconcile::PositionFields;
use roster_core::types::DbId;

use crate::models::position::Position;

const COLUMNS: &str = "id, employee_id, position_resource_id, display_order";

pub struct PositionRepo;

impl PositionRepo {
    /// All positions of the given employees, in display order.
    pub async fn list_by_employees(
        pool: &PgPool,
        employee_ids: &[DbId],
    ) -> Result<Vec<Position>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM positions
             WHERE employee_id = ANY($1)
             ORDER BY display_order ASC, id ASC"
        );
        sqlx::query_as::<_, Position>(&query)
            .bind(employee_ids)
            .fetch_all(pool)
            .await
    }

    /// Insert a position under `employee_id`, returning its new id.
    pub async fn create(
        conn: &mut PgConnection,
        employee_id: DbId,
        fields: &PositionFields,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO positions (employee_id, position_resource_id, display_order)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(employee_id)
        .bind(fields.position_resource_id)
        .bind(fields.display_order)
        .fetch_one(conn)
        .await
    }

    /// Overwrite the scalar fields of a position owned by `employee_id`.
    /// Returns `true` if the row was updated.
    pub async fn update(
        conn: &mut PgConnection,
        employee_id: DbId,
        id: DbId,
        fields: &PositionFields,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE positions SET position_resource_id = $3, display_order = $4
             WHERE id = $1 AND employee_id = $2",
        )
        .bind(id)
        .bind(employee_id)
        .bind(fields.position_resource_id)
        .bind(fields.display_order)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete positions owned by `employee_id`; their subtrees cascade.
    pub async fn delete_many(
        conn: &mut PgConnection,
        employee_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM positions WHERE id = ANY($1) AND employee_id = $2")
            .bind(ids)
            .bind(employee_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
