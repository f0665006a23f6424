//! Backing allocator seam
//!
//! The pool never talks to the global allocator directly; it goes through
//! [`BackingAlloc`] so tests can substitute an instrumented implementation
//! and embedders can route block acquisition wherever they like.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use crate::pool::POOL_ALIGNMENT;

/// Source of raw memory for pool blocks and large payloads
///
/// # Safety
///
/// Implementors must ensure that:
/// - `acquire(size)` returns a pointer valid for reads and writes of `size`
///   bytes, aligned to [`POOL_ALIGNMENT`], exclusively owned by the caller
///   until released. The memory is *not* required to be zeroed.
/// - `release` accepts exactly the pointers previously handed out by
///   `acquire` on the same instance, with the original `size`.
pub unsafe trait BackingAlloc {
    /// Acquires `size` bytes of raw memory, or `None` on failure
    fn acquire(&self, size: usize) -> Option<NonNull<u8>>;

    /// Releases a region previously returned by [`acquire`](Self::acquire)
    ///
    /// # Safety
    /// - `ptr` must have been returned by `acquire` on this instance
    /// - `size` must match the original acquisition size
    /// - `ptr` must not be used after this call
    unsafe fn release(&self, ptr: NonNull<u8>, size: usize);
}

/// Backing allocator over `std::alloc`
///
/// The default source of memory for [`Pool`](crate::Pool).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBacking;

unsafe impl BackingAlloc for SystemBacking {
    fn acquire(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, POOL_ALIGNMENT).ok()?;
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has non-zero size and valid alignment.
        // alloc returns null on failure, mapped to None below.
        NonNull::new(unsafe { alloc(layout) })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: caller guarantees ptr came from acquire with this size,
        // so the layout reconstructs the original allocation exactly.
        unsafe {
            dealloc(
                ptr.as_ptr(),
                Layout::from_size_align_unchecked(size, POOL_ALIGNMENT),
            );
        }
    }
}
