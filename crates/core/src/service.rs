//! Request-scoped orchestration of profile writes.
//!
//! Reads go straight to the store. Writes resolve attachments first and only
//! then touch the store, so a failed upload never leaves a partial tree.

use std::sync::Arc;

use crate::attachment::{AttachmentResolver, ResolverSettings, UploadPort};
use crate::error::CoreError;
use crate::profile::{DesiredEmployee, EmployeeTree};
use crate::reconcile::GraphReconciler;
use crate::store::ProfileStore;
use crate::types::{DbId, Version};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    resolver: AttachmentResolver,
    reconciler: GraphReconciler,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        uploader: Arc<dyn UploadPort>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            resolver: AttachmentResolver::new(uploader, settings),
            reconciler: GraphReconciler::new(Arc::clone(&store)),
            store,
        }
    }

    pub async fn get(&self, employee_id: DbId) -> Result<EmployeeTree, CoreError> {
        self.store.load(employee_id).await
    }

    /// Create an employee with its whole initial subtree.
    pub async fn create(&self, desired: DesiredEmployee) -> Result<EmployeeTree, CoreError> {
        let resolved = self.resolver.resolve_tree(desired, None).await?;
        let id = self.store.create(&resolved).await?;
        tracing::info!(employee_id = id, "Created employee profile");
        self.store.load(id).await
    }

    /// Replace an employee's profile with `desired`.
    ///
    /// `expected_version`, when given, must equal the stored version or the
    /// update is refused with [`CoreError::ConcurrencyConflict`] before any
    /// upload happens.
    pub async fn update(
        &self,
        employee_id: DbId,
        desired: DesiredEmployee,
        expected_version: Option<Version>,
    ) -> Result<EmployeeTree, CoreError> {
        let persisted = self.store.load(employee_id).await?;
        if let Some(expected) = expected_version {
            if expected != persisted.version {
                return Err(CoreError::ConcurrencyConflict {
                    employee_id,
                    expected_version: expected,
                });
            }
        }

        let resolved = self.resolver.resolve_tree(desired, Some(&persisted)).await?;
        self.reconciler
            .reconcile(employee_id, &resolved, &persisted)
            .await?;
        self.store.load(employee_id).await
    }

    pub async fn delete(&self, employee_id: DbId) -> Result<(), CoreError> {
        self.store.delete(employee_id).await?;
        tracing::info!(employee_id, "Deleted employee profile");
        Ok(())
    }
}
