//! Content domain: entities mirrored from persistent storage and the pure
//! folder-hierarchy engine.

pub mod entities;
pub mod hierarchy;
