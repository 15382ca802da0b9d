//! Repository traits describing the external collaborators.
//!
//! The data layer and the feature-flag provider are owned elsewhere; this
//! subsystem consumes them behind async traits so the orchestrator can be
//! constructed with in-memory fakes in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{FolderRecord, PageRecord, PluginData, SiteConfigRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("data layer timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Feature-flag lookup failed. Always folded into "caching disabled" by the
/// orchestrator, never surfaced.
#[derive(Debug, Error)]
#[error("feature flag lookup failed: {0}")]
pub struct FlagError(pub String);

/// Read access to the content store backing the logical caches.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn fetch_all_pages(&self, include_drafts: bool) -> Result<Vec<PageRecord>, RepoError>;

    async fn fetch_all_folders(&self) -> Result<Vec<FolderRecord>, RepoError>;

    async fn fetch_site_config(&self) -> Result<SiteConfigRecord, RepoError>;

    async fn fetch_plugin_data(&self) -> Result<PluginData, RepoError>;
}

/// Runtime feature-flag provider.
#[async_trait]
pub trait FlagProvider: Send + Sync {
    async fn is_caching_enabled(&self) -> Result<bool, FlagError>;
}
