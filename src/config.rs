//! Constructor-time configuration.
//!
//! Every store validates its configuration before allocating, so an invalid
//! setting never yields a usable store.

use crate::error::ConfigError;

/// Validate a fixed slot or entry capacity.
pub fn validate_capacity(capacity: usize) -> Result<usize, ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    Ok(capacity)
}

/// Growth parameters for [`LinearHashStore`](crate::LinearHashStore).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearHashConfig {
    /// Number of buckets before any split (`m0`).
    pub base_buckets: usize,
    /// Load factor above which buckets are split (`alphaMax`). A load factor
    /// exactly equal to this value does not trigger a split.
    pub max_load_factor: f64,
}

impl LinearHashConfig {
    pub const DEFAULT_BASE_BUCKETS: usize = 8;
    pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

    pub fn new(base_buckets: usize, max_load_factor: f64) -> Self {
        Self {
            base_buckets,
            max_load_factor,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_buckets == 0 {
            return Err(ConfigError::ZeroBaseBuckets);
        }
        if !(self.max_load_factor.is_finite() && self.max_load_factor > 0.0) {
            return Err(ConfigError::InvalidLoadFactor(self.max_load_factor));
        }
        Ok(())
    }
}

impl Default for LinearHashConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_BUCKETS, Self::DEFAULT_MAX_LOAD_FACTOR)
    }
}
