//! Region-based memory pool
//!
//! A [`Pool`] owns an ordered chain of fixed-size blocks, each used as a
//! bump-pointer sub-allocator for requests at or below the small/large
//! threshold. Larger requests are acquired individually from the backing
//! allocator and tracked in a record list so they can be released one at a
//! time or in bulk. Deferred finalizers registered with
//! [`Pool::add_cleanup`] run exactly once at teardown.
//!
//! ## Invariants
//!
//! - Block cursors move forward monotonically between resets; no address is
//!   handed out twice while its block is live
//! - A block that repeatedly fails to satisfy requests is skipped by the
//!   probe cursor but never unlinked; reset and teardown still reach it
//! - A failed allocation leaves no partial record behind: the large and
//!   cleanup lists only ever contain fully initialized entries
//!
//! ## Not thread-safe
//!
//! All operations take `&mut self`; share a pool across threads only behind
//! external synchronization, or give each thread its own pool.

mod block;
mod cleanup;
mod large;
#[allow(clippy::module_inception)]
mod pool;
mod stats;

pub use self::pool::Pool;
pub use self::stats::PoolStats;

use crate::error::{PoolError, Result};
use crate::utils::align_up;

/// Platform word size; small aligned allocations are aligned to this
pub const ALIGNMENT: usize = std::mem::size_of::<usize>();

/// Alignment of every backing region the pool acquires
pub const POOL_ALIGNMENT: usize = 16;

/// Cap on the small/large threshold, in bytes
///
/// A pool larger than a page never services a small request bigger than
/// this, so a single oversized request cannot monopolize a block.
pub const PAGE_SIZE: usize = 4096;

/// Default pool size when none is configured
pub const DEFAULT_POOL_SIZE: usize = 16 * 1024;

/// Bytes reserved at the head of the first block
///
/// The classic self-describing layout stores the pool's control record at
/// the start of its own first block; the reservation keeps that layout
/// contract (and the usable-region arithmetic that follows from it) even
/// though bookkeeping now lives in safe owned structures.
pub(crate) const POOL_HEADER_SIZE: usize = 8 * std::mem::size_of::<usize>();

/// Bytes reserved at the head of each growth block (data header only)
pub(crate) const BLOCK_HEADER_SIZE: usize = 4 * std::mem::size_of::<usize>();

/// Block-space charge for one large-payload record
pub(crate) const LARGE_RECORD_SIZE: usize = 2 * std::mem::size_of::<usize>();

/// Block-space charge for one cleanup record
pub(crate) const CLEANUP_RECORD_SIZE: usize = 3 * std::mem::size_of::<usize>();

/// Probe failures a block tolerates before the scan cursor skips past it
pub(crate) const BLOCK_FAIL_LIMIT: u32 = 4;

/// Large-record slots inspected when looking for a reusable free slot
pub(crate) const LARGE_SCAN_LIMIT: usize = 3;

/// Smallest viable pool: room for the header plus two large records
pub const MIN_POOL_SIZE: usize =
    align_up(POOL_HEADER_SIZE + 2 * LARGE_RECORD_SIZE, POOL_ALIGNMENT);

/// Pool configuration builder
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Total size of the first block; growth blocks copy it
    pub initial_size: usize,
    /// Whether to count allocations in [`PoolStats`]
    pub track_stats: bool,
}

impl PoolConfig {
    /// Creates new config with default values
    pub fn new() -> Self {
        Self {
            initial_size: DEFAULT_POOL_SIZE,
            track_stats: cfg!(debug_assertions),
        }
    }

    /// Sets the first block's total size
    #[must_use = "builder methods must be chained or built"]
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Enables/disables statistics tracking
    #[must_use = "builder methods must be chained or built"]
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.initial_size == 0 {
            return Err(PoolError::invalid_config(
                "initial size must be greater than 0",
            ));
        }
        if self.initial_size > isize::MAX as usize - POOL_ALIGNMENT {
            return Err(PoolError::invalid_config("initial size overflows a layout"));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_pool_size_is_aligned() {
        assert_eq!(MIN_POOL_SIZE % POOL_ALIGNMENT, 0);
        assert!(MIN_POOL_SIZE >= POOL_HEADER_SIZE + 2 * LARGE_RECORD_SIZE);
    }

    #[test]
    fn config_builder() {
        let config = PoolConfig::new()
            .with_initial_size(8192)
            .with_stats(true);

        assert_eq!(config.initial_size, 8192);
        assert!(config.track_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let invalid = PoolConfig::new().with_initial_size(0);
        assert!(invalid.validate().is_err());

        let overflow = PoolConfig::new().with_initial_size(usize::MAX);
        assert!(overflow.validate().is_err());
    }
}
