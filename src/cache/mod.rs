//! Fronda cache layer.
//!
//! A generic keyed store ([`CacheStore`]) with TTL expiry, tag-based bulk
//! invalidation and single-flight population, plus the logical cache keys
//! and invalidation tags used by the orchestrator.
//!
//! ## Configuration
//!
//! Cache behaviour is controlled via `fronda.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! global_ttl_secs = 1800
//! pages_ttl_secs = 900
//! # ... see src/config for all options
//! ```

mod config;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, CacheTag};
pub use store::{CacheStore, PopulationError};
