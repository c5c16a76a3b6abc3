//! Cross-field rules for a desired employee profile.
//!
//! Per-field rules (required strings, non-empty lists, positive ids) are
//! declared on the request form; the rules here need the whole tree or the
//! uploaded bytes.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::profile::{DesiredEmployee, ImageUpload};
use crate::types::declared_id;

/// Largest accepted image upload (2 MiB).
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Accepted MIME type prefix for image uploads.
pub const IMAGE_CONTENT_TYPE_PREFIX: &str = "image/";

/// Check every cross-field rule, reporting all violations at once.
pub fn validate_employee(desired: &DesiredEmployee) -> Result<(), CoreError> {
    let mut problems: Vec<String> = Vec::new();
    let mut report = |msg: String| {
        if !problems.contains(&msg) {
            problems.push(msg);
        }
    };

    let mut roles = HashSet::new();
    for position in &desired.positions {
        if !roles.insert(position.position_resource_id) {
            report("Position cannot be duplicated.".into());
        }

        let mut tools = HashSet::new();
        for tool in &position.tool_languages {
            if !tools.insert(tool.tool_language_resource_id) {
                report("Tool/Language cannot be duplicated.".into());
            }
            if tool.from_year > tool.to_year {
                report("From year must be less than or equal to To year.".into());
            }
            for image in &tool.images {
                if let Err(msg) = check_image(image) {
                    report(msg);
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(problems.join(" ")))
    }
}

fn check_image(image: &ImageUpload) -> Result<(), String> {
    let content = image.content.as_ref().filter(|c| !c.bytes.is_empty());
    match content {
        None if declared_id(image.id).is_none() => {
            Err("Please provide either an image id or data for each image.".into())
        }
        None => Ok(()),
        Some(c) if c.bytes.len() > MAX_IMAGE_BYTES => {
            Err("Image size must be less than or equal to 2MB.".into())
        }
        Some(c) if !c.content_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX) => {
            Err("Invalid image format. Only image files are allowed.".into())
        }
        Some(_) => Ok(()),
    }
}
