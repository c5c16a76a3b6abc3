use crate::types::{DbId, Version};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An attachment could not be stored externally. Nothing was written.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// A new image arrived with neither content nor a prior reference.
    #[error("Image has no content and no existing reference (image id {image_id:?})")]
    MissingContent { image_id: Option<DbId> },

    /// The employee was modified since it was read.
    #[error("Employee {employee_id} was modified concurrently (expected version {expected_version})")]
    ConcurrencyConflict {
        employee_id: DbId,
        expected_version: Version,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
