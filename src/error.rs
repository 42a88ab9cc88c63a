//! Error taxonomy shared by the stores.
//!
//! A missing key is never an error: lookups and removals return `None`.

use thiserror::Error;

/// Failures reported by store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No free slot exists for a new key.
    ///
    /// Returned by fixed-capacity put paths once every slot is occupied. The
    /// store is left exactly as it was before the call.
    #[error("store is full: no free slot for a new key (capacity {capacity})")]
    CapacityExhausted { capacity: usize },
}

/// Construction-time misconfiguration.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A fixed capacity of zero was requested.
    #[error("capacity must be positive")]
    ZeroCapacity,

    /// Linear hashing needs at least one initial bucket.
    #[error("base bucket count must be positive")]
    ZeroBaseBuckets,

    /// The split threshold must be a positive, finite ratio.
    #[error("max load factor must be positive and finite, got {0}")]
    InvalidLoadFactor(f64),
}
