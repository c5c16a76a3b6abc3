//! Handlers for employee profiles.
//!
//! Writes arrive as multipart requests (see [`crate::form`]) and go through
//! the profile service, which uploads new images before touching the
//! database and reconciles updates against the stored tree.

use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use roster_core::profile::{DesiredEmployee, EmployeeTree, ImageContent};
use roster_core::search::{
    clamp_limit, clamp_offset, normalize_search, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use roster_core::types::{DbId, Version};
use roster_core::validation::validate_employee;
use roster_db::profile_store::load_trees;
use roster_db::repositories::EmployeeRepo;

use crate::error::{AppError, AppResult};
use crate::form::ProfileForm;
use crate::query::EmployeeListParams;
use crate::state::AppState;

/// Multipart part carrying the profile JSON.
const PROFILE_PART: &str = "profile";

/// GET /api/v1/employees
///
/// Full profile trees, most experienced first, optionally filtered by name.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<EmployeeListParams>,
) -> AppResult<Json<Vec<EmployeeTree>>> {
    let search = normalize_search(params.search.as_deref());
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let employees = EmployeeRepo::list(&state.pool, search.as_deref(), limit, offset).await?;
    let trees = load_trees(&state.pool, employees).await?;
    Ok(Json(trees))
}

/// GET /api/v1/employees/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<EmployeeTree>> {
    let tree = state.profiles.get(id).await?;
    Ok(Json(tree))
}

/// POST /api/v1/employees
///
/// Creates the employee with its whole subtree. Every image must carry a
/// file; a `version` in the profile JSON is ignored.
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<EmployeeTree>)> {
    let (desired, _) = read_profile(multipart).await?;
    let tree = state.profiles.create(desired).await?;
    Ok((StatusCode::CREATED, Json(tree)))
}

/// PUT /api/v1/employees/{id}
///
/// Replaces the profile. Nodes are matched by id: missing ones are deleted
/// with their subtree, unknown ones are created. Returns 409 if `version` is
/// given and no longer matches.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<EmployeeTree>> {
    let (desired, version) = read_profile(multipart).await?;
    let tree = state.profiles.update(id, desired, version).await?;
    Ok(Json(tree))
}

/// DELETE /api/v1/employees/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.profiles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read the `profile` part and every file part, then validate the result.
async fn read_profile(
    mut multipart: Multipart,
) -> AppResult<(DesiredEmployee, Option<Version>)> {
    let mut profile: Option<ProfileForm> = None;
    let mut files: HashMap<String, ImageContent> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            // Unnamed parts cannot be referenced by an image.
            _ if name.is_empty() => {}
            PROFILE_PART => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let form = serde_json::from_str(&text)
                    .map_err(|e| AppError::BadRequest(format!("Invalid profile JSON: {e}")))?;
                profile = Some(form);
            }
            _ => {
                let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                files.insert(
                    name,
                    ImageContent {
                        bytes: bytes.to_vec(),
                        content_type,
                        file_name,
                    },
                );
            }
        }
    }

    let profile = profile.ok_or_else(|| {
        AppError::BadRequest(format!("Missing required '{PROFILE_PART}' field"))
    })?;
    let (desired, version) = profile.into_desired(&files)?;
    validate_employee(&desired)?;

    tracing::debug!(
        positions = desired.positions.len(),
        images = desired.images().count(),
        files = files.len(),
        "Parsed employee profile"
    );
    Ok((desired, version))
}
