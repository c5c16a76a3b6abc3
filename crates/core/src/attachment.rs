//! Attachment resolution: turn desired images into CDN references.
//!
//! Every image in a desired tree either carries new bytes, which are pushed
//! through the [`UploadPort`] and replaced by the returned URL, or refers to
//! an existing image whose stored URL is carried over. The reconciler only
//! ever sees the resolved form.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::CoreError;
use crate::profile::{
    DesiredEmployee, EmployeeTree, ImageContent, ImageNode, ImageUpload, ResolvedEmployee,
    ResolvedImage,
};
use crate::types::{declared_id, DbId};

/// Default resource tag sent with every upload.
pub const DEFAULT_RESOURCE_TAG: &str = "employee-profile";

/// Default number of uploads allowed in flight for one request.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;

/// Errors reported by an [`UploadPort`].
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The request never completed (connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("upload rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The store answered successfully but returned no URL.
    #[error("upload response did not contain a URL")]
    MissingUrl,
}

/// External object store that keeps image bytes.
///
/// Append-only: uploading the same bytes twice may produce two objects.
#[async_trait]
pub trait UploadPort: Send + Sync {
    /// Store `content` under the logical `resource` tag and return its URL.
    async fn upload(&self, content: &ImageContent, resource: &str) -> Result<String, UploadError>;
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub resource_tag: String,
    pub max_concurrent_uploads: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            resource_tag: DEFAULT_RESOURCE_TAG.to_string(),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }
}

#[derive(Clone)]
pub struct AttachmentResolver {
    uploader: Arc<dyn UploadPort>,
    settings: ResolverSettings,
}

impl AttachmentResolver {
    pub fn new(uploader: Arc<dyn UploadPort>, settings: ResolverSettings) -> Self {
        Self { uploader, settings }
    }

    /// Resolve one image.
    ///
    /// New content is uploaded and wins over `existing`. Without content the
    /// existing URL is reused; with neither the image cannot be persisted and
    /// [`CoreError::MissingContent`] is returned. Upload failures are not
    /// retried.
    pub async fn resolve(
        &self,
        image: ImageUpload,
        existing: Option<&ImageNode>,
    ) -> Result<ResolvedImage, CoreError> {
        let content = image.content.filter(|c| !c.bytes.is_empty());

        let cdn_url = match (content, existing) {
            (Some(content), _) => {
                let url = self
                    .uploader
                    .upload(&content, &self.settings.resource_tag)
                    .await
                    .map_err(|e| {
                        tracing::warn!(
                            image_id = ?image.id,
                            file_name = %content.file_name,
                            error = %e,
                            "Image upload failed"
                        );
                        CoreError::UploadFailed(e.to_string())
                    })?;
                tracing::debug!(image_id = ?image.id, %url, bytes = content.bytes.len(), "Uploaded image");
                url
            }
            (None, Some(existing)) => existing.cdn_url.clone(),
            (None, None) => return Err(CoreError::MissingContent { image_id: image.id }),
        };

        Ok(ResolvedImage {
            id: image.id,
            display_order: image.display_order,
            cdn_url,
        })
    }

    /// Resolve every image of a desired tree.
    ///
    /// Existing images are looked up by id anywhere in `persisted`, so an image
    /// moved under another tool/language keeps its URL. Uploads run
    /// concurrently up to the configured bound; the first failure cancels the
    /// rest and is returned.
    pub async fn resolve_tree(
        &self,
        desired: DesiredEmployee,
        persisted: Option<&EmployeeTree>,
    ) -> Result<ResolvedEmployee, CoreError> {
        let existing: HashMap<DbId, &ImageNode> =
            persisted.map(EmployeeTree::image_index).unwrap_or_default();

        let mut images = Vec::new();
        let skeleton = desired.map_images(|image| images.push(image));
        let total = images.len();

        let resolved: Vec<ResolvedImage> = stream::iter(images.into_iter().map(|image| {
            let prior = declared_id(image.id).and_then(|id| existing.get(&id).copied());
            self.resolve(image, prior)
        }))
        .buffered(self.settings.max_concurrent_uploads.max(1))
        .try_collect()
        .await?;

        tracing::debug!(images = total, "Resolved attachments");

        let mut resolved = resolved.into_iter();
        skeleton.try_map_images(|()| {
            resolved
                .next()
                .ok_or_else(|| CoreError::Internal("resolved image count mismatch".into()))
        })
    }
}
