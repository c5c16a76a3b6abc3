//! Domain model structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row. Inputs for writes are the field structs of
//! `roster_core::reconcile`, shared with the reconciliation plan.

pub mod employee;
pub mod image;
pub mod position;
pub mod resource;
pub mod tool_language;
