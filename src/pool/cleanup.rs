//! Deferred finalizers run at pool teardown

/// One registered finalizer
///
/// The handler and its argument are captured together in the boxed
/// closure; the pool never owns the argument, it only forwards the call.
/// `None` after invocation guarantees exactly-once semantics even if
/// teardown logic runs twice.
struct CleanupRecord {
    handler: Option<Box<dyn FnOnce()>>,
}

/// Registration-ordered list of cleanup records
///
/// Records are never removed individually and persist across pool resets;
/// only teardown invokes them.
pub(crate) struct CleanupList {
    records: Vec<CleanupRecord>,
}

impl CleanupList {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, handler: Box<dyn FnOnce()>) {
        self.records.push(CleanupRecord {
            handler: Some(handler),
        });
    }

    /// Invokes every pending handler in registration order
    pub(crate) fn run_all(&mut self) {
        for record in &mut self.records {
            if let Some(handler) = record.handler.take() {
                handler();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
