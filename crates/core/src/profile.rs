//! Employee profile tree model.
//!
//! Two shapes of the same four-level hierarchy
//! (Employee -> Position -> ToolLanguage -> Image):
//!
//! - the **persisted tree** ([`EmployeeTree`]), as read back from the store,
//!   where every node carries its surrogate id;
//! - the **desired tree** ([`EmployeeInput`]), as submitted by a client, where
//!   ids are optional and the image payload type is generic so the same
//!   structure carries raw uploads ([`DesiredEmployee`]) before attachment
//!   resolution and CDN URLs ([`ResolvedEmployee`]) after it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Version};

// ---------------------------------------------------------------------------
// Persisted tree
// ---------------------------------------------------------------------------

/// A stored employee together with its full subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTree {
    pub id: DbId,
    pub name: String,
    pub version: Version,
    pub positions: Vec<PositionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionNode {
    pub id: DbId,
    pub position_resource_id: DbId,
    pub display_order: i32,
    pub tool_languages: Vec<ToolLanguageNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLanguageNode {
    pub id: DbId,
    pub tool_language_resource_id: DbId,
    pub display_order: i32,
    #[serde(rename = "from")]
    pub from_year: i32,
    #[serde(rename = "to")]
    pub to_year: i32,
    pub description: String,
    pub images: Vec<ImageNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub id: DbId,
    pub cdn_url: String,
    pub display_order: i32,
}

impl EmployeeTree {
    /// Index every persisted image by id, regardless of its parent.
    pub fn image_index(&self) -> HashMap<DbId, &ImageNode> {
        self.positions
            .iter()
            .flat_map(|p| &p.tool_languages)
            .flat_map(|t| &t.images)
            .map(|i| (i.id, i))
            .collect()
    }

    /// Convert the stored tree back into a desired tree that declares every
    /// id and keeps every URL. Reconciling it against `self` is a no-op.
    pub fn to_resolved(&self) -> ResolvedEmployee {
        EmployeeInput {
            name: self.name.clone(),
            positions: self
                .positions
                .iter()
                .map(|p| PositionInput {
                    id: Some(p.id),
                    position_resource_id: p.position_resource_id,
                    display_order: p.display_order,
                    tool_languages: p
                        .tool_languages
                        .iter()
                        .map(|t| ToolLanguageInput {
                            id: Some(t.id),
                            tool_language_resource_id: t.tool_language_resource_id,
                            display_order: t.display_order,
                            from_year: t.from_year,
                            to_year: t.to_year,
                            description: t.description.clone(),
                            images: t
                                .images
                                .iter()
                                .map(|i| ResolvedImage {
                                    id: Some(i.id),
                                    display_order: i.display_order,
                                    cdn_url: i.cdn_url.clone(),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired tree
// ---------------------------------------------------------------------------

/// Client-submitted target state of an employee. `I` is the image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeInput<I> {
    pub name: String,
    pub positions: Vec<PositionInput<I>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInput<I> {
    /// `None` or `Some(0)` for a position that does not exist yet.
    pub id: Option<DbId>,
    pub position_resource_id: DbId,
    pub display_order: i32,
    pub tool_languages: Vec<ToolLanguageInput<I>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLanguageInput<I> {
    pub id: Option<DbId>,
    pub tool_language_resource_id: DbId,
    pub display_order: i32,
    pub from_year: i32,
    pub to_year: i32,
    pub description: String,
    pub images: Vec<I>,
}

/// Raw image bytes received from the client.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageContent")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// A desired image before resolution: new content, an existing id, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub id: Option<DbId>,
    pub display_order: i32,
    pub content: Option<ImageContent>,
}

/// A desired image after resolution. Always carries a CDN URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub id: Option<DbId>,
    pub display_order: i32,
    pub cdn_url: String,
}

pub type DesiredEmployee = EmployeeInput<ImageUpload>;
pub type ResolvedEmployee = EmployeeInput<ResolvedImage>;

impl<I> EmployeeInput<I> {
    /// Iterate every image in depth-first order.
    pub fn images(&self) -> impl Iterator<Item = &I> {
        self.positions
            .iter()
            .flat_map(|p| &p.tool_languages)
            .flat_map(|t| &t.images)
    }

    /// Rebuild the tree with every image passed through `f`, depth-first.
    /// Stops at the first error.
    pub fn try_map_images<J, E>(
        self,
        mut f: impl FnMut(I) -> Result<J, E>,
    ) -> Result<EmployeeInput<J>, E> {
        let mut positions = Vec::with_capacity(self.positions.len());
        for p in self.positions {
            let mut tool_languages = Vec::with_capacity(p.tool_languages.len());
            for t in p.tool_languages {
                let images = t.images.into_iter().map(&mut f).collect::<Result<_, E>>()?;
                tool_languages.push(ToolLanguageInput {
                    id: t.id,
                    tool_language_resource_id: t.tool_language_resource_id,
                    display_order: t.display_order,
                    from_year: t.from_year,
                    to_year: t.to_year,
                    description: t.description,
                    images,
                });
            }
            positions.push(PositionInput {
                id: p.id,
                position_resource_id: p.position_resource_id,
                display_order: p.display_order,
                tool_languages,
            });
        }
        Ok(EmployeeInput {
            name: self.name,
            positions,
        })
    }

    /// Infallible form of [`try_map_images`](Self::try_map_images).
    pub fn map_images<J>(self, mut f: impl FnMut(I) -> J) -> EmployeeInput<J> {
        match self.try_map_images::<J, std::convert::Infallible>(|i| Ok(f(i))) {
            Ok(tree) => tree,
            Err(never) => match never {},
        }
    }
}
