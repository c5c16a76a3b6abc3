//! Persistence port for employee profile trees.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::profile::{EmployeeTree, ResolvedEmployee};
use crate::reconcile::ReconcilePlan;
use crate::types::{DbId, Version};

/// Transactional storage of whole employee trees.
///
/// Implementations must cascade the deletion of a node to its whole subtree
/// and must apply a [`ReconcilePlan`] atomically.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the full tree rooted at `employee_id`.
    ///
    /// Fails with [`CoreError::NotFound`] when no such employee exists.
    async fn load(&self, employee_id: DbId) -> Result<EmployeeTree, CoreError>;

    /// Insert a brand-new employee with its whole subtree. Returns the new id.
    async fn create(&self, employee: &ResolvedEmployee) -> Result<DbId, CoreError>;

    /// Apply a plan in one transaction, guarded by `plan.expected_version`.
    ///
    /// Returns the version after the commit. Fails with
    /// [`CoreError::ConcurrencyConflict`] when the stored version moved on and
    /// with [`CoreError::NotFound`] when the employee is gone.
    async fn commit(&self, plan: &ReconcilePlan) -> Result<Version, CoreError>;

    /// Delete an employee and everything below it.
    async fn delete(&self, employee_id: DbId) -> Result<(), CoreError>;
}
