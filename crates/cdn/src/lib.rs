//! CDN upload client.
//!
//! Pushes image bytes to the external CDN over HTTP and returns the URL the
//! CDN assigned. [`CdnClient`] implements the core
//! [`UploadPort`](roster_core::attachment::UploadPort).

pub mod client;
pub mod config;

pub use client::{CdnClient, CdnError, UploadResponse};
pub use config::CdnConfig;
