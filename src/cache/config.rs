//! Runtime cache configuration.
//!
//! Converted from the typed settings layer (`crate::config`) into the
//! `time::Duration` values the store and orchestrator work with.

use time::Duration;

use super::keys::CacheKey;
use crate::config::CacheSettings;

// Defaults mirror crate::config; kept here so the cache layer is usable
// without the settings loader (tests, embedding).
const DEFAULT_GLOBAL_TTL_SECS: i64 = 30 * 60;
const DEFAULT_PAGES_TTL_SECS: i64 = 15 * 60;
const DEFAULT_FOLDERS_TTL_SECS: i64 = 15 * 60;
const DEFAULT_SITE_CONFIG_TTL_SECS: i64 = 60 * 60;
const DEFAULT_PLUGIN_DATA_TTL_SECS: i64 = 60 * 60;
const DEFAULT_REFILL_TIMEOUT_SECS: i64 = 10;
const DEFAULT_PASS_DEADLINE_SECS: i64 = 30;

/// Cache behaviour knobs resolved to concrete durations.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Static kill switch, AND-ed with the runtime feature flag.
    pub enabled: bool,
    /// Staleness window for a full verification pass.
    pub global_ttl: Duration,
    /// Entry TTL for the page list cache.
    pub pages_ttl: Duration,
    /// Entry TTL for the folder list and both tree caches.
    pub folders_ttl: Duration,
    /// Entry TTL for the site configuration cache.
    pub site_config_ttl: Duration,
    /// Entry TTL for the plugin data cache.
    pub plugin_data_ttl: Duration,
    /// Upper bound for one refill task.
    pub refill_timeout: Duration,
    /// Upper bound for a whole verification pass.
    pub pass_deadline: Duration,
    /// Whether page refills include drafts (admin-facing deployments).
    pub include_drafts: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global_ttl: Duration::seconds(DEFAULT_GLOBAL_TTL_SECS),
            pages_ttl: Duration::seconds(DEFAULT_PAGES_TTL_SECS),
            folders_ttl: Duration::seconds(DEFAULT_FOLDERS_TTL_SECS),
            site_config_ttl: Duration::seconds(DEFAULT_SITE_CONFIG_TTL_SECS),
            plugin_data_ttl: Duration::seconds(DEFAULT_PLUGIN_DATA_TTL_SECS),
            refill_timeout: Duration::seconds(DEFAULT_REFILL_TIMEOUT_SECS),
            pass_deadline: Duration::seconds(DEFAULT_PASS_DEADLINE_SECS),
            include_drafts: false,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            global_ttl: settings.global_ttl(),
            pages_ttl: settings.pages_ttl(),
            folders_ttl: settings.folders_ttl(),
            site_config_ttl: settings.site_config_ttl(),
            plugin_data_ttl: settings.plugin_data_ttl(),
            refill_timeout: settings.refill_timeout(),
            pass_deadline: settings.pass_deadline(),
            include_drafts: settings.include_drafts,
        }
    }
}

impl CacheConfig {
    /// Entry TTL for one logical cache.
    pub fn ttl_for(&self, key: CacheKey) -> Duration {
        match key {
            CacheKey::Pages => self.pages_ttl,
            CacheKey::FolderList | CacheKey::FolderTree | CacheKey::PageFolderTree => {
                self.folders_ttl
            }
            CacheKey::SiteConfig => self.site_config_ttl,
            CacheKey::PluginData => self.plugin_data_ttl,
        }
    }
}
