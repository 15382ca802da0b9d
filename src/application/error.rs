use thiserror::Error;

use crate::cache::{CacheKey, PopulationError};

/// Outcome of a failed verification pass.
///
/// Refills are isolated: one failure never blocks its siblings, and a
/// partially failed pass is reported rather than masked.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("cache verification completed with {} failed refill(s)", .failures.len())]
    Partial {
        failures: Vec<(CacheKey, PopulationError)>,
    },
    #[error("cache verification pass exceeded its deadline")]
    Deadline,
}

impl VerifyError {
    /// Logical caches whose refill failed in this pass.
    pub fn failed_caches(&self) -> Vec<CacheKey> {
        match self {
            VerifyError::Partial { failures } => failures.iter().map(|(key, _)| *key).collect(),
            VerifyError::Deadline => Vec::new(),
        }
    }
}
