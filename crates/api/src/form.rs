//! Multipart request form for creating and updating an employee profile.
//!
//! A request carries one `profile` part with the JSON below and any number
//! of file parts. Images reference a file part by its multipart field name:
//!
//! ```text
//! {
//!   "name": "Ada",
//!   "version": 3,
//!   "positions": [{
//!     "id": 10, "position_resource_id": 1, "display_order": 0,
//!     "tool_languages": [{
//!       "id": 100, "tool_language_resource_id": 2, "display_order": 0,
//!       "from": 2018, "to": 2022, "description": "...",
//!       "images": [{ "id": 1000, "display_order": 0, "file": "photo-1" }]
//!     }]
//!   }]
//! }
//! ```
//!
//! Field-level rules are declared with `validator`; rules spanning several
//! nodes live in `roster_core::validation`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};
use roster_core::error::CoreError;
use roster_core::profile::{
    DesiredEmployee, EmployeeInput, ImageContent, ImageUpload, PositionInput, ToolLanguageInput,
};
use roster_core::types::{DbId, Version};

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Name is required."))]
    pub name: String,
    /// Version the client last read. Omit to update whatever is stored.
    pub version: Option<Version>,
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one position is required."), nested)]
    pub positions: Vec<PositionForm>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PositionForm {
    pub id: Option<DbId>,
    #[validate(
        required(message = "Position is required."),
        range(min = 1, message = "Position is required.")
    )]
    pub position_resource_id: Option<DbId>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one tool/language is required."),
        nested
    )]
    pub tool_languages: Vec<ToolLanguageForm>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ToolLanguageForm {
    pub id: Option<DbId>,
    #[validate(
        required(message = "Tool/Language is required."),
        range(min = 1, message = "Tool/Language is required.")
    )]
    pub tool_language_resource_id: Option<DbId>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(rename = "from")]
    #[validate(required(message = "From year is required."))]
    pub from_year: Option<i32>,
    #[serde(rename = "to")]
    #[validate(required(message = "To year is required."))]
    pub to_year: Option<i32>,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Description is required."))]
    pub description: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one image is required."))]
    pub images: Vec<ImageForm>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageForm {
    pub id: Option<DbId>,
    #[serde(default)]
    pub display_order: i32,
    /// Name of the multipart part holding new bytes for this image.
    pub file: Option<String>,
}

impl ProfileForm {
    /// Check the field rules and build the desired tree, attaching uploaded
    /// files by part name.
    pub fn into_desired(
        self,
        files: &HashMap<String, ImageContent>,
    ) -> AppResult<(DesiredEmployee, Option<Version>)> {
        self.validate()
            .map_err(|e| AppError::Core(CoreError::Validation(validation_message(&e))))?;

        let positions = self
            .positions
            .into_iter()
            .map(|p| {
                let tool_languages = p
                    .tool_languages
                    .into_iter()
                    .map(|t| {
                        let images = t
                            .images
                            .into_iter()
                            .map(|i| image_upload(i, files))
                            .collect::<AppResult<Vec<_>>>()?;
                        Ok(ToolLanguageInput {
                            id: t.id,
                            tool_language_resource_id: t.tool_language_resource_id.unwrap_or_default(),
                            display_order: t.display_order,
                            from_year: t.from_year.unwrap_or_default(),
                            to_year: t.to_year.unwrap_or_default(),
                            description: t.description.trim().to_string(),
                            images,
                        })
                    })
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(PositionInput {
                    id: p.id,
                    position_resource_id: p.position_resource_id.unwrap_or_default(),
                    display_order: p.display_order,
                    tool_languages,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let desired = EmployeeInput {
            name: self.name.trim().to_string(),
            positions,
        };
        Ok((desired, self.version))
    }
}

/// Reject empty and whitespace-only strings.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn image_upload(
    image: ImageForm,
    files: &HashMap<String, ImageContent>,
) -> AppResult<ImageUpload> {
    let content = match image.file {
        Some(part) => Some(files.get(&part).cloned().ok_or_else(|| {
            AppError::BadRequest(format!("Image refers to missing file part '{part}'"))
        })?),
        None => None,
    };
    Ok(ImageUpload {
        id: image.id,
        display_order: image.display_order,
        content,
    })
}

/// Flatten nested validator errors into one sentence list, each message once.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.sort();
    messages.dedup();
    messages.join(" ")
}

fn collect_messages(errors: &ValidationErrors, out: &mut Vec<String>) {
    for kind in errors.errors().values() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(inner, out);
                }
            }
        }
    }
}
