use std::time::Duration;

use roster_core::attachment::{
    ResolverSettings, DEFAULT_MAX_CONCURRENT_UPLOADS, DEFAULT_RESOURCE_TAG,
};

use crate::client::CdnError;

/// CDN connection settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    /// Base URL of the CDN, without trailing slash.
    pub base_url: String,
    /// Logical resource tag sent with every upload.
    pub resource: String,
    /// Per-request timeout in seconds (default: `30`).
    pub timeout_secs: u64,
    /// Uploads allowed in flight for one request (default: `4`).
    pub max_concurrent_uploads: usize,
}

impl CdnConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default            |
    /// |------------------------------|--------------------|
    /// | `CDN_URL`                    | required           |
    /// | `CDN_RESOURCE`               | `employee-profile` |
    /// | `CDN_TIMEOUT_SECS`           | `30`               |
    /// | `CDN_MAX_CONCURRENT_UPLOADS` | `4`                |
    pub fn from_env() -> Result<Self, CdnError> {
        let base_url = std::env::var("CDN_URL")
            .map_err(|_| CdnError::Config("CDN_URL must be set".into()))?;

        let resource =
            std::env::var("CDN_RESOURCE").unwrap_or_else(|_| DEFAULT_RESOURCE_TAG.into());

        let timeout_secs: u64 = std::env::var("CDN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .map_err(|_| CdnError::Config("CDN_TIMEOUT_SECS must be a valid u64".into()))?;

        let max_concurrent_uploads: usize = std::env::var("CDN_MAX_CONCURRENT_UPLOADS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_UPLOADS.to_string())
            .parse()
            .map_err(|_| {
                CdnError::Config("CDN_MAX_CONCURRENT_UPLOADS must be a valid usize".into())
            })?;

        Ok(Self::new(base_url, resource, timeout_secs, max_concurrent_uploads))
    }

    pub fn new(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        timeout_secs: u64,
        max_concurrent_uploads: usize,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource: resource.into(),
            timeout_secs,
            max_concurrent_uploads: max_concurrent_uploads.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Attachment resolver settings derived from this configuration.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            resource_tag: self.resource.clone(),
            max_concurrent_uploads: self.max_concurrent_uploads,
        }
    }
}
