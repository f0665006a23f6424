//! Block descriptor: one contiguous backing region with a bump cursor

use std::ptr::NonNull;

use super::ALIGNMENT;
use crate::utils::align_up;

/// One block in the pool's chain
///
/// The descriptor tracks offsets into the region rather than raw cursor
/// pointers; `cursor <= size` always holds, and every address handed out
/// lies in `[ptr + header, ptr + size)`. The region itself is owned by the
/// pool and released through its backing allocator, so `Block` carries no
/// `Drop` of its own.
pub(crate) struct Block {
    ptr: NonNull<u8>,
    size: usize,
    /// Post-header offset; `rewind` returns the cursor here
    header: usize,
    cursor: usize,
    failed: u32,
}

impl Block {
    pub(crate) fn new(ptr: NonNull<u8>, size: usize, header: usize) -> Self {
        debug_assert!(header <= size);
        Self {
            ptr,
            size,
            header,
            cursor: header,
            failed: 0,
        }
    }

    /// Tries to carve `size` bytes out of this block
    ///
    /// Commits the cursor and returns the start address on success; leaves
    /// the block untouched when there is no room.
    pub(crate) fn probe(&mut self, size: usize, aligned: bool) -> Option<NonNull<u8>> {
        let base = self.ptr.as_ptr() as usize;
        let candidate = if aligned {
            // align the address, not the offset; base alignment makes the
            // two equivalent but this keeps the contract explicit
            align_up(base + self.cursor, ALIGNMENT) - base
        } else {
            self.cursor
        };

        let end = candidate.checked_add(size)?;
        if end > self.size {
            return None;
        }

        self.cursor = end;
        // SAFETY: candidate < size, so the offset stays inside the region
        // acquired for this block.
        Some(unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(candidate)) })
    }

    /// Rewinds the cursor to the post-header start and clears the fail count
    pub(crate) fn rewind(&mut self) {
        self.cursor = self.header;
        self.failed = 0;
    }

    /// Records one probe failure, returning the count *before* the bump
    pub(crate) fn note_failure(&mut self) -> u32 {
        let previous = self.failed;
        self.failed = self.failed.saturating_add(1);
        previous
    }

    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize {
        self.size - self.cursor
    }
}
