//! PostgreSQL implementation of [`ProfileStore`].
//!
//! Trees are read with one query per level (`= ANY($1)` over the parent ids)
//! and assembled in memory. Every write runs in a single transaction; the
//! unique constraints on sibling resources are deferred to commit time so a
//! plan may swap resources between siblings.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use roster_core::error::CoreError;
use roster_core::profile::{
    EmployeeTree, ImageNode, PositionNode, ResolvedEmployee, ToolLanguageNode,
};
use roster_core::reconcile::{
    ImageFields, ParentRef, PositionFields, ReconcilePlan, ToolLanguageFields,
};
use roster_core::store::ProfileStore;
use roster_core::types::{DbId, Version};

use crate::models::employee::Employee;
use crate::repositories::{EmployeeRepo, ImageRepo, PositionRepo, ToolLanguageRepo};

/// PostgreSQL error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL error code for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// PostgreSQL error code for check constraint violations.
const CHECK_VIOLATION: &str = "23514";

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a database error onto the core taxonomy.
///
/// Constraint violations are caused by the submitted profile and surface as
/// client errors; everything else is internal.
pub fn db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let constraint = db_err.constraint().unwrap_or_default();
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return CoreError::Conflict(match constraint {
                    "uq_positions_employee_resource" => "Position cannot be duplicated.".into(),
                    "uq_tool_languages_position_resource" => {
                        "Tool/Language cannot be duplicated.".into()
                    }
                    _ => format!("Duplicate value violates {constraint}"),
                });
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return CoreError::Validation(format!(
                    "Referenced resource does not exist ({constraint})"
                ));
            }
            Some(CHECK_VIOLATION) => {
                return CoreError::Validation(
                    "From year must be less than or equal to To year.".into(),
                );
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(err.to_string())
}

/// Assemble full trees for the given employees, preserving their order.
///
/// Issues three queries regardless of how many employees are requested.
pub async fn load_trees(
    pool: &PgPool,
    employees: Vec<Employee>,
) -> Result<Vec<EmployeeTree>, sqlx::Error> {
    if employees.is_empty() {
        return Ok(Vec::new());
    }

    let employee_ids: Vec<DbId> = employees.iter().map(|e| e.id).collect();
    let positions = PositionRepo::list_by_employees(pool, &employee_ids).await?;
    let position_ids: Vec<DbId> = positions.iter().map(|p| p.id).collect();
    let tools = ToolLanguageRepo::list_by_positions(pool, &position_ids).await?;
    let tool_ids: Vec<DbId> = tools.iter().map(|t| t.id).collect();
    let images = ImageRepo::list_by_tool_languages(pool, &tool_ids).await?;

    let mut images_by_tool: HashMap<DbId, Vec<ImageNode>> = HashMap::new();
    for image in images {
        images_by_tool
            .entry(image.tool_language_id)
            .or_default()
            .push(ImageNode {
                id: image.id,
                cdn_url: image.cdn_url,
                display_order: image.display_order,
            });
    }

    let mut tools_by_position: HashMap<DbId, Vec<ToolLanguageNode>> = HashMap::new();
    for tool in tools {
        tools_by_position
            .entry(tool.position_id)
            .or_default()
            .push(ToolLanguageNode {
                images: images_by_tool.remove(&tool.id).unwrap_or_default(),
                id: tool.id,
                tool_language_resource_id: tool.tool_language_resource_id,
                display_order: tool.display_order,
                from_year: tool.from_year,
                to_year: tool.to_year,
                description: tool.description,
            });
    }

    let mut positions_by_employee: HashMap<DbId, Vec<PositionNode>> = HashMap::new();
    for position in positions {
        positions_by_employee
            .entry(position.employee_id)
            .or_default()
            .push(PositionNode {
                tool_languages: tools_by_position.remove(&position.id).unwrap_or_default(),
                id: position.id,
                position_resource_id: position.position_resource_id,
                display_order: position.display_order,
            });
    }

    Ok(employees
        .into_iter()
        .map(|e| EmployeeTree {
            positions: positions_by_employee.remove(&e.id).unwrap_or_default(),
            id: e.id,
            name: e.name,
            version: e.version,
        })
        .collect())
}

/// Resolve the parent of a create against the ids inserted one level up.
fn parent_id(parent: ParentRef, created_above: &[DbId]) -> Result<DbId, CoreError> {
    match parent {
        ParentRef::Persisted(id) => Ok(id),
        ParentRef::Created(index) => created_above.get(index).copied().ok_or_else(|| {
            CoreError::Internal(format!("plan refers to missing parent create #{index}"))
        }),
    }
}

/// Explain why the version guard refused `plan`, given the stored version.
fn version_mismatch(plan: &ReconcilePlan, current: Option<Version>) -> CoreError {
    match current {
        None => CoreError::NotFound {
            entity: "Employee",
            id: plan.employee_id,
        },
        Some(current) => {
            tracing::info!(
                employee_id = plan.employee_id,
                expected_version = plan.expected_version,
                current_version = current,
                "Rejected stale reconcile plan"
            );
            stale_node(plan)
        }
    }
}

/// The node an update targeted was not found under the employee.
fn stale_node(plan: &ReconcilePlan) -> CoreError {
    CoreError::ConcurrencyConflict {
        employee_id: plan.employee_id,
        expected_version: plan.expected_version,
    }
}

async fn apply_positions(
    conn: &mut PgConnection,
    plan: &ReconcilePlan,
) -> Result<Vec<DbId>, CoreError> {
    let level = &plan.positions;
    if !level.deletes.is_empty() {
        PositionRepo::delete_many(&mut *conn, plan.employee_id, &level.deletes)
            .await
            .map_err(db_error)?;
    }
    for update in &level.updates {
        let found = PositionRepo::update(&mut *conn, plan.employee_id, update.id, &update.fields)
            .await
            .map_err(db_error)?;
        if !found {
            return Err(stale_node(plan));
        }
    }

    let mut created = Vec::with_capacity(level.creates.len());
    for create in &level.creates {
        let employee_id = parent_id(create.parent, &[])?;
        if employee_id != plan.employee_id {
            return Err(CoreError::Internal(format!(
                "position create targets employee {employee_id} in a plan for {}",
                plan.employee_id
            )));
        }
        let id = PositionRepo::create(&mut *conn, employee_id, &create.fields)
            .await
            .map_err(db_error)?;
        created.push(id);
    }
    Ok(created)
}

async fn apply_tool_languages(
    conn: &mut PgConnection,
    plan: &ReconcilePlan,
    created_positions: &[DbId],
) -> Result<Vec<DbId>, CoreError> {
    let level = &plan.tool_languages;
    if !level.deletes.is_empty() {
        ToolLanguageRepo::delete_many(&mut *conn, plan.employee_id, &level.deletes)
            .await
            .map_err(db_error)?;
    }
    for update in &level.updates {
        let found =
            ToolLanguageRepo::update(&mut *conn, plan.employee_id, update.id, &update.fields)
                .await
                .map_err(db_error)?;
        if !found {
            return Err(stale_node(plan));
        }
    }

    let mut created = Vec::with_capacity(level.creates.len());
    for create in &level.creates {
        let position_id = parent_id(create.parent, created_positions)?;
        let id = ToolLanguageRepo::create(&mut *conn, position_id, &create.fields)
            .await
            .map_err(db_error)?;
        created.push(id);
    }
    Ok(created)
}

async fn apply_images(
    conn: &mut PgConnection,
    plan: &ReconcilePlan,
    created_tools: &[DbId],
) -> Result<(), CoreError> {
    let level = &plan.images;
    if !level.deletes.is_empty() {
        ImageRepo::delete_many(&mut *conn, plan.employee_id, &level.deletes)
            .await
            .map_err(db_error)?;
    }
    for update in &level.updates {
        let found = ImageRepo::update(&mut *conn, plan.employee_id, update.id, &update.fields)
            .await
            .map_err(db_error)?;
        if !found {
            return Err(stale_node(plan));
        }
    }
    for create in &level.creates {
        let tool_language_id = parent_id(create.parent, created_tools)?;
        ImageRepo::create(&mut *conn, tool_language_id, &create.fields)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load(&self, employee_id: DbId) -> Result<EmployeeTree, CoreError> {
        let employee = EmployeeRepo::find_by_id(&self.pool, employee_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            })?;

        load_trees(&self.pool, vec![employee])
            .await
            .map_err(db_error)?
            .pop()
            .ok_or_else(|| CoreError::Internal("loaded tree disappeared".into()))
    }

    async fn create(&self, employee: &ResolvedEmployee) -> Result<DbId, CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = EmployeeRepo::create(&mut *tx, &employee.name)
            .await
            .map_err(db_error)?;
        for position in &employee.positions {
            let position_id =
                PositionRepo::create(&mut *tx, row.id, &PositionFields::from(position))
                    .await
                    .map_err(db_error)?;
            for tool in &position.tool_languages {
                let tool_id =
                    ToolLanguageRepo::create(&mut *tx, position_id, &ToolLanguageFields::from(tool))
                        .await
                        .map_err(db_error)?;
                for image in &tool.images {
                    ImageRepo::create(&mut *tx, tool_id, &ImageFields::from(image))
                        .await
                        .map_err(db_error)?;
                }
            }
        }

        tx.commit().await.map_err(db_error)?;
        Ok(row.id)
    }

    async fn commit(&self, plan: &ReconcilePlan) -> Result<Version, CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if plan.is_empty() {
            let current = EmployeeRepo::lock_version(&mut *tx, plan.employee_id)
                .await
                .map_err(db_error)?;
            return match current {
                Some(version) if version == plan.expected_version => Ok(version),
                other => Err(version_mismatch(plan, other)),
            };
        }

        // The guarded update takes the row lock, serialising writers of the
        // same employee for the rest of the transaction.
        let bumped = EmployeeRepo::bump_version(
            &mut *tx,
            plan.employee_id,
            plan.expected_version,
            plan.name.as_deref(),
        )
        .await
        .map_err(db_error)?;

        let version = match bumped {
            Some(version) => version,
            None => {
                let current = EmployeeRepo::lock_version(&mut *tx, plan.employee_id)
                    .await
                    .map_err(db_error)?;
                return Err(version_mismatch(plan, current));
            }
        };

        let created_positions = apply_positions(&mut *tx, plan).await?;
        let created_tools = apply_tool_languages(&mut *tx, plan, &created_positions).await?;
        apply_images(&mut *tx, plan, &created_tools).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(version)
    }

    async fn delete(&self, employee_id: DbId) -> Result<(), CoreError> {
        let deleted = EmployeeRepo::delete(&self.pool, employee_id)
            .await
            .map_err(db_error)?;
        if deleted {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            })
        }
    }
}
