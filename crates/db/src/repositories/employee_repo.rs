//! Repository for the `employees` table.

use sqlx::{PgConnection, PgPool};
use roster_core::types::{DbId, Version};

use crate::models::employee::Employee;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, version, created_at, updated_at";

/// Provides CRUD operations for employees plus the version guard used by
/// reconciliation commits.
pub struct EmployeeRepo;

impl EmployeeRepo {
    /// Insert a new employee at version 1, returning the created row.
    pub async fn create(conn: &mut PgConnection, name: &str) -> Result<Employee, sqlx::Error> {
        let query = format!("INSERT INTO employees (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Employee>(&query)
            .bind(name)
            .fetch_one(conn)
            .await
    }

    /// Find an employee by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM employees WHERE id = $1");
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List employees, most experienced first.
    ///
    /// Experience is the sum of `to_year - from_year` over all of the
    /// employee's tool/languages. When `search` is given, an employee matches
    /// if its name matches the search as a full-text query on the `simple`
    /// dictionary, or contains it ignoring case and accents.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees e
             WHERE $1::text IS NULL
                OR to_tsvector('simple', e.name) @@ plainto_tsquery('simple', $1)
                OR unaccent(e.name) ILIKE '%' || unaccent($1) || '%'
             ORDER BY COALESCE((
                 SELECT SUM(t.to_year - t.from_year)
                 FROM positions p
                 JOIN tool_languages t ON t.position_id = p.id
                 WHERE p.employee_id = e.id
             ), 0) DESC, e.id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Read the current version, locking the row until the transaction ends.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn lock_version(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Version>, sqlx::Error> {
        sqlx::query_scalar::<_, Version>("SELECT version FROM employees WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite the name (when given) and bump the version, but only if the
    /// stored version still equals `expected_version`.
    ///
    /// Returns the new version, or `None` when the row is missing or stale.
    pub async fn bump_version(
        conn: &mut PgConnection,
        id: DbId,
        expected_version: Version,
        name: Option<&str>,
    ) -> Result<Option<Version>, sqlx::Error> {
        sqlx::query_scalar::<_, Version>(
            "UPDATE employees SET
                name = COALESCE($3, name),
                version = version + 1,
                updated_at = NOW()
             WHERE id = $1 AND version = $2
             RETURNING version",
        )
        .bind(id)
        .bind(expected_version)
        .bind(name)
        .fetch_optional(conn)
        .await
    }

    /// Delete an employee by ID; positions, tools and images cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
