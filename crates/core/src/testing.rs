//! Test doubles for the persistence and upload ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::attachment::{UploadError, UploadPort};
use crate::error::CoreError;
use crate::profile::{
    EmployeeTree, ImageContent, ImageNode, PositionNode, ResolvedEmployee, ToolLanguageNode,
};
use crate::reconcile::{ParentRef, ReconcilePlan};
use crate::store::ProfileStore;
use crate::types::{DbId, Version};

pub mod fixtures {
    use super::*;

    /// `Employee{1, positions:[{10, tools:[{100, images:[{1000, "a"}]}]}]}`
    pub fn scenario_tree() -> EmployeeTree {
        EmployeeTree {
            id: 1,
            name: "Ada".into(),
            version: 1,
            positions: vec![PositionNode {
                id: 10,
                position_resource_id: 1,
                display_order: 0,
                tool_languages: vec![tool(100, 1, vec![image(1000, "a")])],
            }],
        }
    }

    /// Two positions, the first with two tools, every tool with one image.
    pub fn two_position_tree() -> EmployeeTree {
        EmployeeTree {
            id: 1,
            name: "Ada".into(),
            version: 1,
            positions: vec![
                PositionNode {
                    id: 10,
                    position_resource_id: 1,
                    display_order: 0,
                    tool_languages: vec![
                        tool(100, 1, vec![image(1000, "a")]),
                        tool(101, 2, vec![image(1001, "b")]),
                    ],
                },
                PositionNode {
                    id: 20,
                    position_resource_id: 2,
                    display_order: 1,
                    tool_languages: vec![tool(200, 5, vec![image(2000, "c")])],
                },
            ],
        }
    }

    fn tool(id: DbId, resource: DbId, images: Vec<ImageNode>) -> ToolLanguageNode {
        ToolLanguageNode {
            id,
            tool_language_resource_id: resource,
            display_order: 0,
            from_year: 2018,
            to_year: 2022,
            description: "Worked on it".into(),
            images,
        }
    }

    fn image(id: DbId, url: &str) -> ImageNode {
        ImageNode {
            id,
            cdn_url: url.into(),
            display_order: 0,
        }
    }

    pub fn png(name: &str) -> ImageContent {
        ImageContent {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".into(),
            file_name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

struct MemoryState {
    employees: HashMap<DbId, EmployeeTree>,
    next_id: DbId,
    writes: usize,
}

/// A [`ProfileStore`] over nested trees. Deleting a node drops its subtree.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                employees: HashMap::new(),
                next_id: 10_000,
                writes: 0,
            }),
        }
    }

    pub fn with(tree: EmployeeTree) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().employees.insert(tree.id, tree);
        store
    }

    /// Number of row writes applied so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

fn fresh_id(next_id: &mut DbId) -> DbId {
    *next_id += 1;
    *next_id
}

fn parent_id(parent: ParentRef, created: &[DbId]) -> Result<DbId, CoreError> {
    match parent {
        ParentRef::Persisted(id) => Ok(id),
        ParentRef::Created(index) => created
            .get(index)
            .copied()
            .ok_or_else(|| CoreError::Internal(format!("no created parent at {index}"))),
    }
}

fn apply(tree: &mut EmployeeTree, plan: &ReconcilePlan, next_id: &mut DbId) -> Result<(), CoreError> {
    if let Some(name) = &plan.name {
        tree.name = name.clone();
    }

    // Positions
    tree.positions
        .retain(|p| !plan.positions.deletes.contains(&p.id));
    for update in &plan.positions.updates {
        let p = tree
            .positions
            .iter_mut()
            .find(|p| p.id == update.id)
            .ok_or_else(|| CoreError::Internal(format!("position {} missing", update.id)))?;
        p.position_resource_id = update.fields.position_resource_id;
        p.display_order = update.fields.display_order;
    }
    let mut created_positions = Vec::new();
    for create in &plan.positions.creates {
        let id = fresh_id(next_id);
        tree.positions.push(PositionNode {
            id,
            position_resource_id: create.fields.position_resource_id,
            display_order: create.fields.display_order,
            tool_languages: Vec::new(),
        });
        created_positions.push(id);
    }

    // Tool/languages
    for p in &mut tree.positions {
        p.tool_languages
            .retain(|t| !plan.tool_languages.deletes.contains(&t.id));
    }
    for update in &plan.tool_languages.updates {
        let t = tree
            .positions
            .iter_mut()
            .flat_map(|p| p.tool_languages.iter_mut())
            .find(|t| t.id == update.id)
            .ok_or_else(|| CoreError::Internal(format!("tool {} missing", update.id)))?;
        t.tool_language_resource_id = update.fields.tool_language_resource_id;
        t.display_order = update.fields.display_order;
        t.from_year = update.fields.from_year;
        t.to_year = update.fields.to_year;
        t.description = update.fields.description.clone();
    }
    let mut created_tools = Vec::new();
    for create in &plan.tool_languages.creates {
        let parent = parent_id(create.parent, &created_positions)?;
        let id = fresh_id(next_id);
        let p = tree
            .positions
            .iter_mut()
            .find(|p| p.id == parent)
            .ok_or_else(|| CoreError::Internal(format!("position {parent} missing")))?;
        p.tool_languages.push(ToolLanguageNode {
            id,
            tool_language_resource_id: create.fields.tool_language_resource_id,
            display_order: create.fields.display_order,
            from_year: create.fields.from_year,
            to_year: create.fields.to_year,
            description: create.fields.description.clone(),
            images: Vec::new(),
        });
        created_tools.push(id);
    }

    // Images
    for t in tree.positions.iter_mut().flat_map(|p| p.tool_languages.iter_mut()) {
        t.images.retain(|i| !plan.images.deletes.contains(&i.id));
    }
    for update in &plan.images.updates {
        let i = tree
            .positions
            .iter_mut()
            .flat_map(|p| p.tool_languages.iter_mut())
            .flat_map(|t| t.images.iter_mut())
            .find(|i| i.id == update.id)
            .ok_or_else(|| CoreError::Internal(format!("image {} missing", update.id)))?;
        i.cdn_url = update.fields.cdn_url.clone();
        i.display_order = update.fields.display_order;
    }
    for create in &plan.images.creates {
        let parent = parent_id(create.parent, &created_tools)?;
        let id = fresh_id(next_id);
        let t = tree
            .positions
            .iter_mut()
            .flat_map(|p| p.tool_languages.iter_mut())
            .find(|t| t.id == parent)
            .ok_or_else(|| CoreError::Internal(format!("tool {parent} missing")))?;
        t.images.push(ImageNode {
            id,
            cdn_url: create.fields.cdn_url.clone(),
            display_order: create.fields.display_order,
        });
    }

    Ok(())
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load(&self, employee_id: DbId) -> Result<EmployeeTree, CoreError> {
        let state = self.state.lock().unwrap();
        state
            .employees
            .get(&employee_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            })
    }

    async fn create(&self, employee: &ResolvedEmployee) -> Result<DbId, CoreError> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let id = fresh_id(&mut state.next_id);
        let mut tree = EmployeeTree {
            id,
            name: employee.name.clone(),
            version: 1,
            positions: Vec::new(),
        };
        for p in &employee.positions {
            let mut position = PositionNode {
                id: fresh_id(&mut state.next_id),
                position_resource_id: p.position_resource_id,
                display_order: p.display_order,
                tool_languages: Vec::new(),
            };
            for t in &p.tool_languages {
                let mut tool = ToolLanguageNode {
                    id: fresh_id(&mut state.next_id),
                    tool_language_resource_id: t.tool_language_resource_id,
                    display_order: t.display_order,
                    from_year: t.from_year,
                    to_year: t.to_year,
                    description: t.description.clone(),
                    images: Vec::new(),
                };
                for i in &t.images {
                    tool.images.push(ImageNode {
                        id: fresh_id(&mut state.next_id),
                        cdn_url: i.cdn_url.clone(),
                        display_order: i.display_order,
                    });
                }
                position.tool_languages.push(tool);
            }
            tree.positions.push(position);
        }
        state.employees.insert(id, tree);
        Ok(id)
    }

    async fn commit(&self, plan: &ReconcilePlan) -> Result<Version, CoreError> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let current = state
            .employees
            .get(&plan.employee_id)
            .ok_or(CoreError::NotFound {
                entity: "Employee",
                id: plan.employee_id,
            })?;
        if current.version != plan.expected_version {
            return Err(CoreError::ConcurrencyConflict {
                employee_id: plan.employee_id,
                expected_version: plan.expected_version,
            });
        }
        if plan.is_empty() {
            return Ok(current.version);
        }

        // Work on a copy so a failing plan leaves the stored tree untouched.
        let mut next = current.clone();
        let mut next_id = state.next_id;
        apply(&mut next, plan, &mut next_id)?;
        next.version += 1;

        let summary = plan.summary();
        state.writes += summary.created + summary.updated + summary.deleted;
        state.next_id = next_id;
        let version = next.version;
        state.employees.insert(plan.employee_id, next);
        Ok(version)
    }

    async fn delete(&self, employee_id: DbId) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .employees
            .remove(&employee_id)
            .map(|_| ())
            .ok_or(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            })
    }
}

// ---------------------------------------------------------------------------
// FakeUploader
// ---------------------------------------------------------------------------

/// Returns `https://cdn.test/{n}/{file_name}` for the n-th upload, or fails
/// for a configured file name.
pub struct FakeUploader {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_on: Option<String>,
    delay: Duration,
    resources: Mutex<Vec<String>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            fail_on: None,
            delay: Duration::ZERO,
            resources: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_on: Some(file_name.to_string()),
            ..Self::new()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn resources(&self) -> Vec<String> {
        self.resources.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadPort for FakeUploader {
    async fn upload(&self, content: &ImageContent, resource: &str) -> Result<String, UploadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.resources.lock().unwrap().push(resource.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(content.file_name.as_str()) {
            return Err(UploadError::Rejected {
                status: 500,
                body: "storage unavailable".into(),
            });
        }
        Ok(format!("https://cdn.test/{n}/{}", content.file_name))
    }
}
