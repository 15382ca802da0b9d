//! Cache orchestration over the six logical content caches.
//!
//! [`SiteCache`] composes one [`CacheStore`] with a refill routine per
//! logical cache and a single global staleness marker. A verification pass
//! runs `CheckingStaleness → {Fresh | RefillNeeded} → Refilling → Done`:
//! the feature flag is consulted first (errors fail open to "disabled"),
//! a stale or absent marker selects all six caches for refill, the refills
//! run concurrently behind a join-all barrier, and the marker advances only
//! once every refill in the pass has settled successfully.
//!
//! Reads go through the per-cache getters, which hit the store directly
//! with their own key and TTL; they never consult the pass machinery.

use std::sync::{Arc, RwLock};

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::error::VerifyError;
use crate::application::repos::{ContentRepo, FlagProvider};
use crate::cache::{CacheConfig, CacheKey, CacheStore, CacheTag, PopulationError};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{FolderRecord, PageRecord, PluginData, SiteConfigRecord};
use crate::domain::hierarchy::{FolderNode, attach_pages, build_folder_tree};

const SOURCE: &str = "application::site_cache";

/// Value of one logical cache entry.
#[derive(Debug, Clone)]
pub enum CachedView {
    Pages(Vec<PageRecord>),
    FolderList(Vec<FolderRecord>),
    FolderTree(Vec<FolderNode>),
    PageFolderTree(Vec<FolderNode>),
    SiteConfig(SiteConfigRecord),
    PluginData(PluginData),
}

/// Orchestrator owning the six logical caches.
///
/// All collaborators are injected at construction; there is no global
/// state, so every test can build a fresh instance.
pub struct SiteCache {
    store: CacheStore<CacheKey, CachedView>,
    repo: Arc<dyn ContentRepo>,
    flags: Arc<dyn FlagProvider>,
    config: CacheConfig,
    last_verified_at: RwLock<Option<OffsetDateTime>>,
}

impl SiteCache {
    pub fn new(
        repo: Arc<dyn ContentRepo>,
        flags: Arc<dyn FlagProvider>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store: CacheStore::new(),
            repo,
            flags,
            config,
            last_verified_at: RwLock::new(None),
        }
    }

    // ========================================================================
    // Verification pass
    // ========================================================================

    /// Run one verification pass over all logical caches.
    ///
    /// Returns `Ok(())` when nothing needed doing or every selected refill
    /// succeeded. Partial failure is reported per cache and leaves the
    /// staleness marker untouched so the next pass retries promptly.
    pub async fn verify_caches(&self) -> Result<(), VerifyError> {
        if !self.caching_enabled().await {
            debug!(target: "fronda::site_cache", "caching disabled; verification pass skipped");
            return Ok(());
        }

        let marker_stale = self.marker_stale();
        let selected: Vec<CacheKey> = if marker_stale {
            CacheKey::ALL.to_vec()
        } else {
            // Marker is fresh; only repair caches that are currently empty
            // or expired (e.g. after an explicit invalidation).
            CacheKey::ALL
                .into_iter()
                .filter(|key| !self.store.is_fresh(key))
                .collect()
        };

        if selected.is_empty() {
            debug!(target: "fronda::site_cache", "all caches fresh; nothing to refill");
            return Ok(());
        }

        debug!(
            target: "fronda::site_cache",
            selected = selected.len(),
            marker_stale,
            "refilling logical caches"
        );

        let pass = self.refill_selected(&selected);
        let failures = match tokio::time::timeout(as_std(self.config.pass_deadline), pass).await {
            Ok(failures) => failures,
            Err(_) => return Err(VerifyError::Deadline),
        };

        if !failures.is_empty() {
            return Err(VerifyError::Partial { failures });
        }

        // Advance the marker only for a full pass; a gap-repair pass leaves
        // the global clock alone.
        if marker_stale {
            *rw_write(&self.last_verified_at, SOURCE, "verify_caches.done") =
                Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn caching_enabled(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.flags.is_caching_enabled().await {
            Ok(enabled) => enabled,
            // Fail open: a broken flag lookup means "disabled", never an error.
            Err(err) => {
                debug!(
                    target: "fronda::site_cache",
                    error = %err,
                    "flag lookup failed; treating caching as disabled"
                );
                false
            }
        }
    }

    fn marker_stale(&self) -> bool {
        match *rw_read(&self.last_verified_at, SOURCE, "marker_stale") {
            None => true,
            Some(last) => OffsetDateTime::now_utc() - last > self.config.global_ttl,
        }
    }

    /// Run the selected refills concurrently and collect every failure.
    ///
    /// Join-all barrier: unordered, no first-failure cancellation; the pass
    /// does not complete until every launched refill has settled.
    async fn refill_selected(&self, selected: &[CacheKey]) -> Vec<(CacheKey, PopulationError)> {
        let refills = selected.iter().map(|&key| self.refill(key));
        futures::future::join_all(refills)
            .await
            .into_iter()
            .filter_map(|(key, result)| result.err().map(|err| (key, err)))
            .collect()
    }

    /// Forced refresh of one logical cache, bounded by the refill timeout.
    async fn refill(&self, key: CacheKey) -> (CacheKey, Result<(), PopulationError>) {
        let populated =
            tokio::time::timeout(as_std(self.config.refill_timeout), self.populate(key));
        let result = match populated.await {
            Ok(Ok(view)) => {
                self.store
                    .insert(key, view, self.config.ttl_for(key), key.tag_set());
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(PopulationError::new(key.as_str(), "refill timed out")),
        };
        if let Err(err) = &result {
            warn!(
                target: "fronda::site_cache",
                cache = key.as_str(),
                error = %err,
                "cache refill failed"
            );
        }
        (key, result)
    }

    /// Build the value for one logical cache from the data layer.
    async fn populate(&self, key: CacheKey) -> Result<CachedView, PopulationError> {
        let view = match key {
            CacheKey::Pages => {
                let pages = self
                    .repo
                    .fetch_all_pages(self.config.include_drafts)
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                CachedView::Pages(pages)
            }
            CacheKey::FolderList => {
                let folders = self
                    .repo
                    .fetch_all_folders()
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                CachedView::FolderList(folders)
            }
            CacheKey::FolderTree => {
                let records = self
                    .repo
                    .fetch_all_folders()
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                CachedView::FolderTree(build_folder_tree(records))
            }
            CacheKey::PageFolderTree => {
                let records = self
                    .repo
                    .fetch_all_folders()
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                let pages = self
                    .repo
                    .fetch_all_pages(self.config.include_drafts)
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                let mut forest = build_folder_tree(records);
                attach_pages(&mut forest, pages);
                CachedView::PageFolderTree(forest)
            }
            CacheKey::SiteConfig => {
                let config = self
                    .repo
                    .fetch_site_config()
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                CachedView::SiteConfig(config)
            }
            CacheKey::PluginData => {
                let data = self
                    .repo
                    .fetch_plugin_data()
                    .await
                    .map_err(|err| PopulationError::new(key.as_str(), err.to_string()))?;
                CachedView::PluginData(data)
            }
        };
        Ok(view)
    }

    // ========================================================================
    // Store-backed getters (independent of the pass machinery)
    // ========================================================================

    async fn cached(&self, key: CacheKey) -> Result<CachedView, PopulationError> {
        self.store
            .get_or_populate(key, self.config.ttl_for(key), key.tag_set(), || {
                self.populate(key)
            })
            .await
    }

    fn unexpected_shape(key: CacheKey) -> PopulationError {
        // Unreachable as long as every refill stores its own variant.
        warn!(
            target: "fronda::site_cache",
            cache = key.as_str(),
            "cached view has unexpected shape"
        );
        PopulationError::new(key.as_str(), "cached view has unexpected shape")
    }

    pub async fn get_pages(&self, force: bool) -> Result<Vec<PageRecord>, PopulationError> {
        if force {
            self.store.invalidate(&CacheKey::Pages);
        }
        match self.cached(CacheKey::Pages).await? {
            CachedView::Pages(pages) => Ok(pages),
            _ => Err(Self::unexpected_shape(CacheKey::Pages)),
        }
    }

    pub async fn get_folder_list(&self) -> Result<Vec<FolderRecord>, PopulationError> {
        match self.cached(CacheKey::FolderList).await? {
            CachedView::FolderList(folders) => Ok(folders),
            _ => Err(Self::unexpected_shape(CacheKey::FolderList)),
        }
    }

    pub async fn get_folder_tree(&self) -> Result<Vec<FolderNode>, PopulationError> {
        match self.cached(CacheKey::FolderTree).await? {
            CachedView::FolderTree(forest) => Ok(forest),
            _ => Err(Self::unexpected_shape(CacheKey::FolderTree)),
        }
    }

    pub async fn get_page_folder_tree(&self) -> Result<Vec<FolderNode>, PopulationError> {
        match self.cached(CacheKey::PageFolderTree).await? {
            CachedView::PageFolderTree(forest) => Ok(forest),
            _ => Err(Self::unexpected_shape(CacheKey::PageFolderTree)),
        }
    }

    pub async fn get_site_config(&self) -> Result<SiteConfigRecord, PopulationError> {
        match self.cached(CacheKey::SiteConfig).await? {
            CachedView::SiteConfig(config) => Ok(config),
            _ => Err(Self::unexpected_shape(CacheKey::SiteConfig)),
        }
    }

    pub async fn get_plugin_data(&self) -> Result<PluginData, PopulationError> {
        match self.cached(CacheKey::PluginData).await? {
            CachedView::PluginData(data) => Ok(data),
            _ => Err(Self::unexpected_shape(CacheKey::PluginData)),
        }
    }

    // ========================================================================
    // Invalidation (write paths)
    // ========================================================================

    pub fn invalidate(&self, key: CacheKey) {
        self.store.invalidate(&key);
    }

    pub fn invalidate_tag(&self, tag: CacheTag) {
        self.store.invalidate_by_tag(&tag);
    }

    /// Invalidate by logical cache name, as used by the admin surface.
    /// Returns false for an unknown name.
    pub fn invalidate_named(&self, name: &str) -> bool {
        match CacheKey::parse(name) {
            Some(key) => {
                self.invalidate(key);
                true
            }
            None => false,
        }
    }

    /// A folder was created, edited or deleted: drop the folder list and
    /// both trees rather than wait on TTL.
    pub fn folder_changed(&self) {
        debug!(target: "fronda::site_cache", "folder write; dropping folder-tagged caches");
        self.invalidate_tag(CacheTag::Folders);
    }

    /// A page was created, edited or deleted.
    pub fn page_changed(&self) {
        debug!(target: "fronda::site_cache", "page write; dropping content-tagged caches");
        self.invalidate_tag(CacheTag::Content);
    }

    pub fn site_config_changed(&self) {
        self.invalidate(CacheKey::SiteConfig);
    }

    pub fn plugins_changed(&self) {
        self.invalidate(CacheKey::PluginData);
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Last stored value for `key` regardless of freshness.
    ///
    /// The explicit staleness-over-unavailability fallback for callers that
    /// prefer an expired view over an error.
    pub fn last_known(&self, key: CacheKey) -> Option<CachedView> {
        self.store.get_stale(&key)
    }

    /// Whether `key` has ever been populated (fresh or stale).
    pub fn is_populated(&self, key: CacheKey) -> bool {
        self.store.contains(&key)
    }

    pub fn last_verified_at(&self) -> Option<OffsetDateTime> {
        *rw_read(&self.last_verified_at, SOURCE, "last_verified_at")
    }
}

fn as_std(duration: time::Duration) -> std::time::Duration {
    duration.try_into().unwrap_or_default()
}
