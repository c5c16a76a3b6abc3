//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async operations. Reads
//! accept `&PgPool`; writes that take part in a reconciliation accept
//! `&mut PgConnection` so callers can run them inside one transaction.

pub mod employee_repo;
pub mod image_repo;
pub mod position_repo;
pub mod resource_repo;
pub mod tool_language_repo;

pub use employee_repo::EmployeeRepo;
pub use image_repo::ImageRepo;
pub use position_repo::PositionRepo;
pub use resource_repo::ResourceRepo;
pub use tool_language_repo::ToolLanguageRepo;
