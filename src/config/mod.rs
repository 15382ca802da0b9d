//! Configuration layer: typed settings with layered precedence (file → env).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::Duration;

const LOCAL_CONFIG_BASENAME: &str = "fronda";
const ENV_PREFIX: &str = "FRONDA";

const DEFAULT_GLOBAL_TTL_SECS: i64 = 30 * 60;
const DEFAULT_PAGES_TTL_SECS: i64 = 15 * 60;
const DEFAULT_FOLDERS_TTL_SECS: i64 = 15 * 60;
const DEFAULT_SITE_CONFIG_TTL_SECS: i64 = 60 * 60;
const DEFAULT_PLUGIN_DATA_TTL_SECS: i64 = 60 * 60;
const DEFAULT_REFILL_TIMEOUT_SECS: i64 = 10;
const DEFAULT_PASS_DEADLINE_SECS: i64 = 30;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration could not be loaded")]
    Load(#[from] config::ConfigError),
}

/// Root settings for the subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
}

/// `[cache]` section of `fronda.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Static kill switch; AND-ed with the runtime feature flag.
    pub enabled: bool,
    /// Staleness window for a full verification pass.
    pub global_ttl_secs: i64,
    /// Entry TTL for the page list cache.
    pub pages_ttl_secs: i64,
    /// Entry TTL for the folder list and tree caches.
    pub folders_ttl_secs: i64,
    /// Entry TTL for the site configuration cache.
    pub site_config_ttl_secs: i64,
    /// Entry TTL for the plugin data cache.
    pub plugin_data_ttl_secs: i64,
    /// Upper bound for one refill task.
    pub refill_timeout_secs: i64,
    /// Upper bound for a whole verification pass.
    pub pass_deadline_secs: i64,
    /// Whether page refills include drafts.
    pub include_drafts: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            global_ttl_secs: DEFAULT_GLOBAL_TTL_SECS,
            pages_ttl_secs: DEFAULT_PAGES_TTL_SECS,
            folders_ttl_secs: DEFAULT_FOLDERS_TTL_SECS,
            site_config_ttl_secs: DEFAULT_SITE_CONFIG_TTL_SECS,
            plugin_data_ttl_secs: DEFAULT_PLUGIN_DATA_TTL_SECS,
            refill_timeout_secs: DEFAULT_REFILL_TIMEOUT_SECS,
            pass_deadline_secs: DEFAULT_PASS_DEADLINE_SECS,
            include_drafts: false,
        }
    }
}

impl CacheSettings {
    pub fn global_ttl(&self) -> Duration {
        Duration::seconds(self.global_ttl_secs)
    }

    pub fn pages_ttl(&self) -> Duration {
        Duration::seconds(self.pages_ttl_secs)
    }

    pub fn folders_ttl(&self) -> Duration {
        Duration::seconds(self.folders_ttl_secs)
    }

    pub fn site_config_ttl(&self) -> Duration {
        Duration::seconds(self.site_config_ttl_secs)
    }

    pub fn plugin_data_ttl(&self) -> Duration {
        Duration::seconds(self.plugin_data_ttl_secs)
    }

    pub fn refill_timeout(&self) -> Duration {
        Duration::seconds(self.refill_timeout_secs)
    }

    pub fn pass_deadline(&self) -> Duration {
        Duration::seconds(self.pass_deadline_secs)
    }
}

impl Settings {
    /// Load `fronda.toml` from the working directory (optional) plus
    /// `FRONDA__`-prefixed environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(None)
    }

    /// Load from an explicit file path instead of the default basename.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
