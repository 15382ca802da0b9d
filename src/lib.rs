//! Fronda caching and content-hierarchy subsystem.
//!
//! Serves derived read views of structured content (pages organised into
//! folders) from named in-process caches:
//!
//! - [`cache`] — generic keyed store with TTL expiry, tag invalidation and
//!   single-flight population.
//! - [`domain`] — content entities and the pure folder-hierarchy engine.
//! - [`application`] — repository traits for the external data layer and the
//!   [`SiteCache`] orchestrator that keeps the six logical caches verified.
//! - [`config`] — typed settings with layered precedence (file → env).
//!
//! The persistence layer, HTTP surfaces, authentication and rendering live
//! elsewhere; this crate only caches derived views over data owned by them.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;

pub use application::site_cache::SiteCache;
pub use cache::{CacheKey, CacheStore, CacheTag, PopulationError};
pub use domain::hierarchy::{FolderNode, build_folder_tree};
