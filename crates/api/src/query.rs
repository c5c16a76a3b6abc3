//! Query parameter types for API handlers.

use serde::Deserialize;

/// Employee listing parameters (`?search=&limit=&offset=`).
///
/// Values are clamped in the handler via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct EmployeeListParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
