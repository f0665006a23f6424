//! The pool itself: lifecycle, small/large routing, teardown

use std::ptr::{self, NonNull};

use tracing::{debug, trace};

use super::block::Block;
use super::cleanup::CleanupList;
use super::large::LargeList;
use super::{
    PoolConfig, PoolStats, BLOCK_FAIL_LIMIT, BLOCK_HEADER_SIZE, CLEANUP_RECORD_SIZE,
    LARGE_RECORD_SIZE, MIN_POOL_SIZE, PAGE_SIZE, POOL_ALIGNMENT, POOL_HEADER_SIZE,
};
use crate::backing::{BackingAlloc, SystemBacking};
use crate::error::{PoolError, Result};

/// Region-based memory pool
///
/// Services small requests by bump-allocating out of a chain of uniformly
/// sized blocks and large requests by acquiring them individually from the
/// backing allocator. Everything the pool hands out is reclaimed in bulk
/// by [`reset`](Pool::reset) or at teardown; large payloads can also be
/// released one at a time with [`free_large`](Pool::free_large).
///
/// Addresses returned by the allocation methods are borrowed from the
/// pool: they become dangling at the next `reset` or when the pool is
/// dropped, and callers must not touch them past that point.
///
/// # Examples
///
/// ```
/// use region_pool::Pool;
///
/// let mut pool = Pool::with_capacity(4096)?;
/// let buf = pool.alloc(128)?;
/// unsafe { std::ptr::write_bytes(buf.as_ptr(), 0xAB, 128) };
/// pool.reset(); // buf is no longer valid
/// # Ok::<(), region_pool::PoolError>(())
/// ```
pub struct Pool<B: BackingAlloc = SystemBacking> {
    backing: B,
    /// Block chain in acquisition order; index 0 is the first block
    blocks: Vec<Block>,
    /// Index of the first block still worth probing
    current: usize,
    /// Small/large threshold, fixed at creation
    max_small: usize,
    large: LargeList,
    cleanups: CleanupList,
    stats: PoolStats,
    track_stats: bool,
}

impl Pool<SystemBacking> {
    /// Creates a pool whose first block totals `size` bytes
    ///
    /// `size` is clamped up to [`MIN_POOL_SIZE`]. Fails with no side
    /// effects if the backing acquisition fails.
    pub fn with_capacity(size: usize) -> Result<Self> {
        Self::create_in(size, SystemBacking)
    }

    /// Creates a pool from a full configuration
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::create_with(config, SystemBacking)
    }
}

impl<B: BackingAlloc> Pool<B> {
    /// Creates a pool drawing memory from `backing`
    pub fn create_in(size: usize, backing: B) -> Result<Self> {
        Self::create_with(PoolConfig::new().with_initial_size(size), backing)
    }

    fn create_with(config: PoolConfig, backing: B) -> Result<Self> {
        config.validate()?;
        let size = config.initial_size.max(MIN_POOL_SIZE);
        let ptr = backing
            .acquire(size)
            .ok_or_else(|| PoolError::out_of_memory(size))?;

        // The threshold caps how big a "small" request may be, so one
        // oversized request cannot monopolize a block.
        let usable = size - POOL_HEADER_SIZE;
        let max_small = usable.min(PAGE_SIZE);

        debug!(size, max_small, "pool created");
        Ok(Self {
            backing,
            blocks: vec![Block::new(ptr, size, POOL_HEADER_SIZE)],
            current: 0,
            max_small,
            large: LargeList::new(),
            cleanups: CleanupList::new(),
            stats: PoolStats::default(),
            track_stats: config.track_stats,
        })
    }

    /// Allocates `size` bytes, word-aligned
    ///
    /// Requests at or below [`max_small`](Pool::max_small) are carved from
    /// block space; anything bigger is acquired individually and tracked
    /// for release via [`free_large`](Pool::free_large).
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>> {
        check_size(size)?;
        if size <= self.max_small {
            self.alloc_small(size, true)
        } else {
            self.alloc_large(size)
        }
    }

    /// Allocates `size` bytes with no alignment guarantee
    ///
    /// Packs byte buffers tightly instead of padding the cursor; use this
    /// when the caller does not care about alignment.
    pub fn alloc_unaligned(&mut self, size: usize) -> Result<NonNull<u8>> {
        check_size(size)?;
        if size <= self.max_small {
            self.alloc_small(size, false)
        } else {
            self.alloc_large(size)
        }
    }

    /// Allocates `size` bytes and zero-fills them
    pub fn alloc_zeroed(&mut self, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.alloc_unaligned(size)?;
        // SAFETY: ptr was just carved out for exactly `size` writable bytes.
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Releases one large payload ahead of teardown
    ///
    /// The record is kept as a reusable slot for a later large request.
    /// An address the pool does not track is ignored.
    pub fn free_large(&mut self, ptr: NonNull<u8>) {
        match self.large.take_matching(ptr) {
            Some((payload, size)) => {
                // SAFETY: the record owned this payload; it was acquired
                // from our backing allocator with this size.
                unsafe { self.backing.release(payload, size) };
                if self.track_stats {
                    self.stats.record_large_free();
                }
                trace!(size, "large payload released");
            }
            None => trace!("free_large: untracked address, ignoring"),
        }
    }

    /// Registers a finalizer to run once at teardown
    ///
    /// Handlers run in registration order, before any pool memory is
    /// released. They persist across [`reset`](Pool::reset). If the pool
    /// cannot carve space for the registration record the handler is
    /// silently dropped; the caller holds no handle to retry against, so
    /// the failure is treated as non-fatal.
    pub fn add_cleanup<F>(&mut self, handler: F)
    where
        F: FnOnce() + 'static,
    {
        if self.alloc_small(CLEANUP_RECORD_SIZE, true).is_err() {
            trace!("cleanup registration dropped: no room for its record");
            return;
        }
        self.cleanups.push(Box::new(handler));
        trace!(registered = self.cleanups.len(), "cleanup registered");
    }

    /// Rewinds the pool for a new phase
    ///
    /// Releases every live large payload, rewinds every block's cursor to
    /// its post-header start and clears its fail count. No block is
    /// released and registered cleanups are kept.
    pub fn reset(&mut self) {
        for record in self.large.iter_mut() {
            if let Some((payload, size)) = record.take_payload() {
                // SAFETY: record owned the payload; size matches acquisition.
                unsafe { self.backing.release(payload, size) };
            }
        }
        self.large.clear();

        for block in &mut self.blocks {
            block.rewind();
        }
        self.current = 0;

        if self.track_stats {
            self.stats.record_reset();
        }
        debug!(blocks = self.blocks.len(), "pool reset");
    }

    /// Tears the pool down
    ///
    /// Equivalent to dropping it: runs every cleanup handler in
    /// registration order, then releases all large payloads and blocks.
    pub fn destroy(self) {
        drop(self);
    }

    /// The small/large threshold in effect
    pub fn max_small(&self) -> usize {
        self.max_small
    }

    /// Number of blocks in the chain
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Counters accumulated so far (all zero unless tracking is enabled)
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Probes the chain from the current block forward, growing on miss
    fn alloc_small(&mut self, size: usize, aligned: bool) -> Result<NonNull<u8>> {
        let mut idx = self.current;
        while idx < self.blocks.len() {
            if let Some(ptr) = self.blocks[idx].probe(size, aligned) {
                if self.track_stats {
                    self.stats.record_small(size);
                }
                trace!(size, aligned, block = idx, "small allocation");
                return Ok(ptr);
            }
            idx += 1;
        }
        self.grow(size, aligned)
    }

    /// Acquires a growth block and satisfies the triggering request from it
    ///
    /// Growth blocks copy the first block's total size regardless of what
    /// triggered the growth. Before the new block is appended, every block
    /// that just failed the probe gets its fail count bumped, and the scan
    /// cursor advances past blocks that have failed too often — they are
    /// likely too fragmented to be worth probing again soon, but they stay
    /// in the chain for reset and teardown.
    fn grow(&mut self, size: usize, aligned: bool) -> Result<NonNull<u8>> {
        let block_size = self.blocks[0].size();
        let ptr = self
            .backing
            .acquire(block_size)
            .ok_or_else(|| PoolError::out_of_memory(block_size))?;

        let mut block = Block::new(ptr, block_size, BLOCK_HEADER_SIZE);
        let out = match block.probe(size, aligned) {
            Some(out) => out,
            None => {
                // cannot happen while max_small <= first-block usable
                // space, but unwind rather than leak if it ever does
                // SAFETY: block was just acquired with this size.
                unsafe { self.backing.release(ptr, block_size) };
                return Err(PoolError::out_of_memory(size));
            }
        };

        let mut current = self.current;
        for idx in self.current..self.blocks.len() {
            if self.blocks[idx].note_failure() > BLOCK_FAIL_LIMIT {
                current = idx + 1;
            }
        }
        self.blocks.push(block);
        self.current = current.min(self.blocks.len() - 1);

        if self.track_stats {
            self.stats.record_small(size);
            self.stats.record_block_growth();
        }
        debug!(
            block_size,
            blocks = self.blocks.len(),
            current = self.current,
            "pool grew by one block"
        );
        Ok(out)
    }

    /// Acquires an individually-tracked payload from the backing allocator
    fn alloc_large(&mut self, size: usize) -> Result<NonNull<u8>> {
        let payload = self
            .backing
            .acquire(size)
            .ok_or_else(|| PoolError::out_of_memory(size))?;

        if let Some(slot) = self.large.find_free_slot() {
            self.large.install(slot, payload, size);
            if self.track_stats {
                self.stats.record_large(size, true);
            }
            trace!(size, slot, "large allocation reused a free record");
            return Ok(payload);
        }

        // Charge the record's bookkeeping space against block space. If
        // that fails, hand the payload back rather than leak it: no
        // partial record may be reachable after a failure.
        if self.alloc_small(LARGE_RECORD_SIZE, true).is_err() {
            // SAFETY: payload was just acquired with this size.
            unsafe { self.backing.release(payload, size) };
            return Err(PoolError::out_of_memory(size));
        }
        self.large.prepend(payload, size);

        if self.track_stats {
            self.stats.record_large(size, false);
        }
        trace!(size, "large allocation");
        Ok(payload)
    }

    #[cfg(test)]
    pub(crate) fn current_index(&self) -> usize {
        self.current
    }
}

impl<B: BackingAlloc> Drop for Pool<B> {
    fn drop(&mut self) {
        debug!(
            cleanups = self.cleanups.len(),
            blocks = self.blocks.len(),
            "destroying pool"
        );

        // Handlers run before any memory is released. They cannot reach
        // the pool (it is mid-drop), so they cannot allocate from it.
        self.cleanups.run_all();

        for record in self.large.iter_mut() {
            if let Some((payload, size)) = record.take_payload() {
                // SAFETY: record owned the payload; size matches acquisition.
                unsafe { self.backing.release(payload, size) };
            }
        }

        // The whole chain is released, including blocks the scan cursor
        // already skipped past.
        for block in self.blocks.drain(..) {
            // SAFETY: block regions are acquired from this backing
            // allocator and released exactly once, here or never.
            unsafe { self.backing.release(block.ptr(), block.size()) };
        }
    }
}

fn check_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(PoolError::invalid_size(size, "zero-size request"));
    }
    if size > isize::MAX as usize - POOL_ALIGNMENT {
        return Err(PoolError::invalid_size(size, "size overflows a layout"));
    }
    Ok(())
}
