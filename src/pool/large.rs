//! Large-payload record list
//!
//! Each record references one individually-acquired payload. Records are
//! index-linked in prepend order (newest at the head) and never unlinked:
//! releasing a payload nulls its slot, and the bounded free-slot scan
//! checks the most recent records first when a new payload arrives.

use std::ptr::NonNull;

use super::LARGE_SCAN_LIMIT;

/// Tracks one large payload; `payload == None` marks a reusable slot
pub(crate) struct LargeRecord {
    payload: Option<NonNull<u8>>,
    size: usize,
    next: Option<usize>,
}

impl LargeRecord {
    /// Takes the payload out for release, leaving a reusable slot
    pub(crate) fn take_payload(&mut self) -> Option<(NonNull<u8>, usize)> {
        self.payload.take().map(|ptr| (ptr, self.size))
    }
}

/// Prepend-ordered list of large records, stored in an index-linked vector
pub(crate) struct LargeList {
    records: Vec<LargeRecord>,
    head: Option<usize>,
}

impl LargeList {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            head: None,
        }
    }

    /// Looks for a free slot near the head of the list
    ///
    /// The scan abandons after [`LARGE_SCAN_LIMIT`] occupied records so a
    /// long-lived pool with many live payloads does not pay a linear walk
    /// on every large request.
    pub(crate) fn find_free_slot(&self) -> Option<usize> {
        let mut seen = 0;
        let mut idx = self.head;
        while let Some(i) = idx {
            if self.records[i].payload.is_none() {
                return Some(i);
            }
            if seen >= LARGE_SCAN_LIMIT {
                break;
            }
            seen += 1;
            idx = self.records[i].next;
        }
        None
    }

    /// Installs a payload into a previously freed slot
    pub(crate) fn install(&mut self, slot: usize, payload: NonNull<u8>, size: usize) {
        let record = &mut self.records[slot];
        debug_assert!(record.payload.is_none());
        record.payload = Some(payload);
        record.size = size;
    }

    /// Prepends a new record holding `payload`
    pub(crate) fn prepend(&mut self, payload: NonNull<u8>, size: usize) {
        self.records.push(LargeRecord {
            payload: Some(payload),
            size,
            next: self.head,
        });
        self.head = Some(self.records.len() - 1);
    }

    /// Nulls the record whose payload matches `ptr`, returning it for release
    ///
    /// Full linear scan; an untracked address returns `None`.
    pub(crate) fn take_matching(&mut self, ptr: NonNull<u8>) -> Option<(NonNull<u8>, usize)> {
        self.records
            .iter_mut()
            .find(|r| r.payload == Some(ptr))
            .and_then(LargeRecord::take_payload)
    }

    /// Visits every record mutably; reset and teardown use this to drain
    /// the remaining payloads
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LargeRecord> {
        self.records.iter_mut()
    }

    /// Drops all records; payloads must already be taken
    pub(crate) fn clear(&mut self) {
        debug_assert!(self.records.iter().all(|r| r.payload.is_none()));
        self.records.clear();
        self.head = None;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
