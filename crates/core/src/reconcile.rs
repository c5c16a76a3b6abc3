//! Hierarchical reconciliation of employee profile trees.
//!
//! [`plan`] diffs a resolved desired tree against the persisted tree level by
//! level (positions, then tool/languages, then images) and produces a
//! [`ReconcilePlan`]: for every level, the persisted ids to delete, the
//! persisted nodes to update in place, and the nodes to create. The function
//! is pure; [`GraphReconciler`] hands the plan to a [`ProfileStore`] which
//! applies it in one transaction.
//!
//! Matching is by declared id among siblings of the same parent, never by
//! content. A persisted node absent from the desired siblings is deleted
//! together with its subtree (the store cascades), so its descendants never
//! appear in the plan. Everything below a created node is created too.
//!
//! Creates refer to their parent through [`ParentRef`]: either the id of a
//! persisted node or the index of a create on the previous level, which the
//! store resolves once that row has been inserted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::CoreError;
use crate::profile::{
    EmployeeTree, ImageNode, PositionInput, PositionNode, ResolvedEmployee, ResolvedImage,
    ToolLanguageInput, ToolLanguageNode,
};
use crate::store::ProfileStore;
use crate::types::{declared_id, DbId, Version};

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// Parent of a node to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// An existing row.
    Persisted(DbId),
    /// The n-th create of the level above, in plan order.
    Created(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFields {
    pub position_resource_id: DbId,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLanguageFields {
    pub tool_language_resource_id: DbId,
    pub display_order: i32,
    pub from_year: i32,
    pub to_year: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFields {
    pub cdn_url: String,
    pub display_order: i32,
}

/// Overwrite the scalar fields of a persisted node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate<F> {
    pub id: DbId,
    pub fields: F,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCreate<F> {
    pub parent: ParentRef,
    pub fields: F,
}

/// Edits for one level of the tree. Applied deletes first, then updates,
/// then creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan<F> {
    pub deletes: Vec<DbId>,
    pub updates: Vec<NodeUpdate<F>>,
    pub creates: Vec<NodeCreate<F>>,
}

impl<F> Default for LevelPlan<F> {
    fn default() -> Self {
        Self {
            deletes: Vec::new(),
            updates: Vec::new(),
            creates: Vec::new(),
        }
    }
}

impl<F> LevelPlan<F> {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.creates.is_empty()
    }
}

/// Every write needed to turn a persisted tree into a desired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub employee_id: DbId,
    /// Version of the persisted tree the plan was computed against.
    pub expected_version: Version,
    /// New employee name, when it differs from the stored one.
    pub name: Option<String>,
    pub positions: LevelPlan<PositionFields>,
    pub tool_languages: LevelPlan<ToolLanguageFields>,
    pub images: LevelPlan<ImageFields>,
}

/// Row counts of a plan, for logging and responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ReconcilePlan {
    fn new(employee_id: DbId, expected_version: Version) -> Self {
        Self {
            employee_id,
            expected_version,
            name: None,
            positions: LevelPlan::default(),
            tool_languages: LevelPlan::default(),
            images: LevelPlan::default(),
        }
    }

    /// `true` when applying the plan would write nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.positions.is_empty()
            && self.tool_languages.is_empty()
            && self.images.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            created: self.positions.creates.len()
                + self.tool_languages.creates.len()
                + self.images.creates.len(),
            updated: usize::from(self.name.is_some())
                + self.positions.updates.len()
                + self.tool_languages.updates.len()
                + self.images.updates.len(),
            deleted: self.positions.deletes.len()
                + self.tool_languages.deletes.len()
                + self.images.deletes.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field projections
// ---------------------------------------------------------------------------

impl<I> From<&PositionInput<I>> for PositionFields {
    fn from(p: &PositionInput<I>) -> Self {
        Self {
            position_resource_id: p.position_resource_id,
            display_order: p.display_order,
        }
    }
}

impl From<&PositionNode> for PositionFields {
    fn from(p: &PositionNode) -> Self {
        Self {
            position_resource_id: p.position_resource_id,
            display_order: p.display_order,
        }
    }
}

impl<I> From<&ToolLanguageInput<I>> for ToolLanguageFields {
    fn from(t: &ToolLanguageInput<I>) -> Self {
        Self {
            tool_language_resource_id: t.tool_language_resource_id,
            display_order: t.display_order,
            from_year: t.from_year,
            to_year: t.to_year,
            description: t.description.clone(),
        }
    }
}

impl From<&ToolLanguageNode> for ToolLanguageFields {
    fn from(t: &ToolLanguageNode) -> Self {
        Self {
            tool_language_resource_id: t.tool_language_resource_id,
            display_order: t.display_order,
            from_year: t.from_year,
            to_year: t.to_year,
            description: t.description.clone(),
        }
    }
}

impl From<&ResolvedImage> for ImageFields {
    fn from(i: &ResolvedImage) -> Self {
        Self {
            cdn_url: i.cdn_url.clone(),
            display_order: i.display_order,
        }
    }
}

impl From<&ImageNode> for ImageFields {
    fn from(i: &ImageNode) -> Self {
        Self {
            cdn_url: i.cdn_url.clone(),
            display_order: i.display_order,
        }
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Desired siblings paired with their persisted counterpart (if any), plus
/// the persisted siblings nobody claimed.
struct Matching<'a, D, P> {
    pairs: Vec<(&'a D, Option<&'a P>)>,
    orphans: Vec<DbId>,
}

fn match_siblings<'a, D, P>(
    entity: &'static str,
    desired: &'a [D],
    persisted: &'a [P],
    desired_id: impl Fn(&D) -> Option<DbId>,
    persisted_id: impl Fn(&P) -> DbId,
) -> Result<Matching<'a, D, P>, CoreError> {
    let by_id: HashMap<DbId, &P> = persisted.iter().map(|p| (persisted_id(p), p)).collect();

    let mut claimed = HashSet::with_capacity(desired.len());
    let mut pairs = Vec::with_capacity(desired.len());
    for d in desired {
        let id = declared_id(desired_id(d));
        if let Some(id) = id {
            if !claimed.insert(id) {
                return Err(CoreError::Validation(format!(
                    "{entity} id {id} appears more than once under the same parent"
                )));
            }
        }
        pairs.push((d, id.and_then(|id| by_id.get(&id).copied())));
    }

    let orphans = persisted
        .iter()
        .map(persisted_id)
        .filter(|id| !claimed.contains(id))
        .collect();

    Ok(Matching { pairs, orphans })
}

/// Compute the plan that turns `persisted` into `desired`.
///
/// Fails only when the desired tree declares the same id twice among
/// siblings.
pub fn plan(
    desired: &ResolvedEmployee,
    persisted: &EmployeeTree,
) -> Result<ReconcilePlan, CoreError> {
    let mut plan = ReconcilePlan::new(persisted.id, persisted.version);

    if desired.name != persisted.name {
        plan.name = Some(desired.name.clone());
    }

    let positions = match_siblings(
        "Position",
        &desired.positions,
        &persisted.positions,
        |p| p.id,
        |p| p.id,
    )?;
    plan.positions.deletes = positions.orphans;

    for (d, p) in positions.pairs {
        let fields = PositionFields::from(d);
        match p {
            Some(p) => {
                if fields != PositionFields::from(p) {
                    plan.positions.updates.push(NodeUpdate { id: p.id, fields });
                }
                plan_tool_languages(
                    &mut plan,
                    &d.tool_languages,
                    ParentRef::Persisted(p.id),
                    &p.tool_languages,
                )?;
            }
            None => {
                let index = plan.positions.creates.len();
                plan.positions.creates.push(NodeCreate {
                    parent: ParentRef::Persisted(persisted.id),
                    fields,
                });
                plan_tool_languages(&mut plan, &d.tool_languages, ParentRef::Created(index), &[])?;
            }
        }
    }

    Ok(plan)
}

fn plan_tool_languages(
    plan: &mut ReconcilePlan,
    desired: &[ToolLanguageInput<ResolvedImage>],
    parent: ParentRef,
    persisted: &[ToolLanguageNode],
) -> Result<(), CoreError> {
    let tools = match_siblings("ToolLanguage", desired, persisted, |t| t.id, |t| t.id)?;
    plan.tool_languages.deletes.extend(tools.orphans);

    for (d, p) in tools.pairs {
        let fields = ToolLanguageFields::from(d);
        match p {
            Some(p) => {
                if fields != ToolLanguageFields::from(p) {
                    plan.tool_languages.updates.push(NodeUpdate { id: p.id, fields });
                }
                plan_images(plan, &d.images, ParentRef::Persisted(p.id), &p.images)?;
            }
            None => {
                let index = plan.tool_languages.creates.len();
                plan.tool_languages.creates.push(NodeCreate { parent, fields });
                plan_images(plan, &d.images, ParentRef::Created(index), &[])?;
            }
        }
    }

    Ok(())
}

fn plan_images(
    plan: &mut ReconcilePlan,
    desired: &[ResolvedImage],
    parent: ParentRef,
    persisted: &[ImageNode],
) -> Result<(), CoreError> {
    let images = match_siblings("Image", desired, persisted, |i| i.id, |i| i.id)?;
    plan.images.deletes.extend(images.orphans);

    for (d, p) in images.pairs {
        let fields = ImageFields::from(d);
        match p {
            Some(p) => {
                if fields != ImageFields::from(p) {
                    plan.images.updates.push(NodeUpdate { id: p.id, fields });
                }
            }
            None => plan.images.creates.push(NodeCreate { parent, fields }),
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Version of the employee after the commit.
    pub version: Version,
    pub summary: PlanSummary,
}

/// Computes plans and applies them through a [`ProfileStore`].
#[derive(Clone)]
pub struct GraphReconciler {
    store: Arc<dyn ProfileStore>,
}

impl GraphReconciler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Diff `desired` against `persisted` and commit the result atomically.
    ///
    /// Never retries: a [`CoreError::ConcurrencyConflict`] from the store is
    /// returned to the caller, who must re-read and try again.
    pub async fn reconcile(
        &self,
        employee_id: DbId,
        desired: &ResolvedEmployee,
        persisted: &EmployeeTree,
    ) -> Result<ReconcileOutcome, CoreError> {
        if persisted.id != employee_id {
            return Err(CoreError::Internal(format!(
                "persisted tree {} does not belong to employee {employee_id}",
                persisted.id
            )));
        }

        let plan = plan(desired, persisted)?;
        let summary = plan.summary();
        tracing::debug!(
            employee_id,
            expected_version = plan.expected_version,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "Computed reconcile plan"
        );

        let version = self.store.commit(&plan).await?;
        tracing::info!(
            employee_id,
            version,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "Reconciled employee profile"
        );

        Ok(ReconcileOutcome { version, summary })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
