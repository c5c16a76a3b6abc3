//! Domain core of the employee profile service.
//!
//! Holds the profile tree model, request validation, the attachment
//! resolver, the graph reconciler and the ports (persistence, upload) that
//! the database and CDN crates implement. Zero internal dependencies so it
//! can be unit-tested without a database or network.

pub mod attachment;
pub mod error;
pub mod profile;
pub mod reconcile;
pub mod search;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
