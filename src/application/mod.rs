//! Application layer: repository traits for the external data layer and the
//! cache orchestrator built on top of them.

pub mod error;
pub mod repos;
pub mod site_cache;
