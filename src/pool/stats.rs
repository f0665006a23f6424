//! Allocation counters
//!
//! Plain fields, no atomics: the pool is single-threaded by design and
//! every mutation happens behind `&mut Pool`.

/// Counters accumulated by a pool when statistics tracking is enabled
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Small (block-carved) allocations served
    pub small_allocs: u64,
    /// Large (individually-acquired) allocations served
    pub large_allocs: u64,
    /// Bytes handed to callers, both paths
    pub bytes_requested: u64,
    /// Growth blocks acquired after the first
    pub blocks_grown: u64,
    /// Large allocations that reused a freed record slot
    pub large_reuse_hits: u64,
    /// Individual large releases via `free_large`
    pub large_freed: u64,
    /// Pool resets
    pub resets: u64,
}

impl PoolStats {
    pub(crate) fn record_small(&mut self, size: usize) {
        self.small_allocs += 1;
        self.bytes_requested += size as u64;
    }

    pub(crate) fn record_large(&mut self, size: usize, reused_slot: bool) {
        self.large_allocs += 1;
        self.bytes_requested += size as u64;
        if reused_slot {
            self.large_reuse_hits += 1;
        }
    }

    pub(crate) fn record_block_growth(&mut self) {
        self.blocks_grown += 1;
    }

    pub(crate) fn record_large_free(&mut self) {
        self.large_freed += 1;
    }

    pub(crate) fn record_reset(&mut self) {
        self.resets += 1;
    }
}
