//! Read-only access to the role and tool/language catalogs.

use std::collections::HashMap;

use sqlx::PgPool;
use roster_core::types::DbId;

use crate::models::resource::{PositionResource, PositionResourceWithTools, ToolLanguageResource};

pub struct ResourceRepo;

impl ResourceRepo {
    /// Every role, ordered by id.
    pub async fn list_position_resources(
        pool: &PgPool,
    ) -> Result<Vec<PositionResource>, sqlx::Error> {
        sqlx::query_as::<_, PositionResource>(
            "SELECT id, name FROM position_resources ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Every tool/language, ordered by id.
    pub async fn list_tool_language_resources(
        pool: &PgPool,
    ) -> Result<Vec<ToolLanguageResource>, sqlx::Error> {
        sqlx::query_as::<_, ToolLanguageResource>(
            "SELECT id, position_resource_id, name FROM tool_language_resources ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Every role with its tools/languages nested underneath.
    pub async fn list_position_resources_with_tools(
        pool: &PgPool,
    ) -> Result<Vec<PositionResourceWithTools>, sqlx::Error> {
        let roles = Self::list_position_resources(pool).await?;
        let mut tools: HashMap<DbId, Vec<ToolLanguageResource>> = HashMap::new();
        for tool in Self::list_tool_language_resources(pool).await? {
            tools.entry(tool.position_resource_id).or_default().push(tool);
        }

        Ok(roles
            .into_iter()
            .map(|role| PositionResourceWithTools {
                tool_language_resources: tools.remove(&role.id).unwrap_or_default(),
                id: role.id,
                name: role.name,
            })
            .collect())
    }
}
